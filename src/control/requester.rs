use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, warn};

use crate::{
    config::{reset_reply, reset_request, RESET_HEADER},
    error::ControlError,
    network::{connect, read_message, write_message, Endpoint, TransportStream},
};

/// Клиентская сторона управляющего канала.
///
/// Одновременно в полёте не больше одной пары запрос/ответ: конкурентные
/// вызовы [`ControlRequester::request`] выстраиваются в очередь на мьютексе.
pub struct ControlRequester {
    endpoint: Endpoint,
    client_id: String,
    conn: Arc<Mutex<TransportStream>>,
    reset_pending: AtomicBool,
}

impl ControlRequester {
    /// Подключается к управляющему сокету; идентификатором клиента служит имя хоста.
    pub async fn connect(endpoint: &Endpoint) -> Result<Self, ControlError> {
        let client_id = hostname::get()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".to_string());
        Self::connect_as(endpoint, client_id).await
    }

    pub async fn connect_as(
        endpoint: &Endpoint,
        client_id: impl Into<String>,
    ) -> Result<Self, ControlError> {
        let stream = connect(endpoint)
            .await
            .map_err(|e| ControlError::Connect {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;
        debug!(endpoint = %endpoint, "Connected control requester");
        Ok(Self {
            endpoint: endpoint.clone(),
            client_id: client_id.into(),
            conn: Arc::new(Mutex::new(stream)),
            reset_pending: AtomicBool::new(false),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Отправляет `(header, body)` и ждёт ответ, возвращая его тело.
    ///
    /// Несовпадение заголовка ответа с заголовком запроса только логируется.
    ///
    /// Обмен выполняется в отдельной задаче под захваченным соединением:
    /// если вызывающий бросит future (например, по таймауту), ответ всё
    /// равно будет вычитан, и следующий запрос получит свой ответ.
    pub async fn request(
        &self,
        header: &str,
        body: Bytes,
    ) -> Result<Bytes, ControlError> {
        let conn = self.conn.clone().lock_owned().await;
        let header = header.to_owned();
        tokio::spawn(exchange(conn, header, body))
            .await
            .map_err(|e| ControlError::Aborted(e.to_string()))?
    }

    /// Текстовый запрос с текстовым ответом.
    pub async fn request_text(
        &self,
        header: &str,
        body: &str,
    ) -> Result<String, ControlError> {
        let reply = self.request(header, Bytes::copy_from_slice(body.as_bytes())).await?;
        Ok(String::from_utf8_lossy(&reply).into_owned())
    }

    /// Отправляет сериализованный объект в почтовый ящик `header`.
    pub async fn send_object<T: Serialize + ?Sized>(
        &self,
        header: &str,
        value: &T,
    ) -> Result<String, ControlError> {
        let body = bincode::serialize(value)?;
        let reply = self.request(header, Bytes::from(body)).await?;
        Ok(String::from_utf8_lossy(&reply).into_owned())
    }

    /// Отправляет сигнал сброса в фоне.
    ///
    /// Если предыдущий сигнал ещё ждёт ответа, вызов ничего не делает и
    /// возвращает `false`. Признак ожидания снимается после получения
    /// ответа или ошибки обмена.
    pub fn send_reset_signal(self: &Arc<Self>) -> bool {
        if self
            .reset_pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Reset request already pending - skipping");
            return false;
        }

        debug!("Sending reset request to server");
        let this = self.clone();
        tokio::spawn(async move {
            let expected = reset_reply(&this.client_id);
            match this.request_text(RESET_HEADER, &reset_request(&this.client_id)).await {
                Ok(reply) if reply == expected => debug!("Reset request acknowledged"),
                Ok(reply) => error!(reply = %reply, "Server returned unexpected reply to reset request"),
                Err(e) => error!(error = %e, "Reset request failed"),
            }
            this.reset_pending.store(false, Ordering::Release);
        });
        true
    }

    pub fn is_reset_pending(&self) -> bool {
        self.reset_pending.load(Ordering::Acquire)
    }
}

async fn exchange(
    mut conn: OwnedMutexGuard<TransportStream>,
    header: String,
    body: Bytes,
) -> Result<Bytes, ControlError> {
    let TransportStream { reader, writer, .. } = &mut *conn;

    let request = [Bytes::copy_from_slice(header.as_bytes()), body];
    write_message(writer, &request).await?;

    let parts = read_message(reader).await?.ok_or(ControlError::Closed)?;
    let [reply_header, reply_body]: [Bytes; 2] = parts
        .try_into()
        .map_err(|parts: Vec<Bytes>| ControlError::MalformedReply(format!("expected 2 parts, got {}", parts.len())))?;

    if reply_header != header.as_bytes() {
        warn!(
            request = %header,
            reply = %String::from_utf8_lossy(&reply_header),
            "Request header does not match reply header"
        );
    }
    Ok(reply_body)
}

impl std::fmt::Debug for ControlRequester {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ControlRequester")
            .field("endpoint", &self.endpoint)
            .field("client_id", &self.client_id)
            .field("reset_pending", &self.is_reset_pending())
            .finish()
    }
}
