use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tempfile::TempDir;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::{debug, info, trace};

use super::proxy::{run_proxy, Publication};
use crate::{
    config::{is_reserved_topic, is_valid_topic, BIND_ATTEMPTS, COMM_OFFSET},
    control::ControlListener,
    error::PublishError,
    network::{bind_pair, Endpoint, TcpBinder, TransportListener},
};

/// Глубина внутреннего канала публикаций.
pub const RELAY_CAPACITY: usize = 1000;

/// Фактические адреса инициализированного брокера.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub data: Endpoint,
    pub control: Endpoint,
    /// Базовый порт; `None` в локальном режиме.
    pub port: Option<u16>,
}

/// Брокер (ретранслятор) данных.
///
/// Владеет публичным сокетом данных и управляющим сокетом. Публикации
/// через [`Broker::send`] попадают во внутренний канал, который читает
/// единственная задача proxy-цикла; только она пишет подписчикам и
/// обновляет кэш последних значений.
///
/// До инициализации `send` ничего не делает. Неудачная инициализация
/// оставляет брокер в этом же состоянии, поэтому сбой привязки портов
/// не роняет производящий процесс.
#[derive(Debug)]
pub struct Broker {
    relay: RwLock<Option<mpsc::Sender<Publication>>>,
    init_lock: AsyncMutex<()>,
    endpoints: RwLock<Option<Endpoints>>,
    control: Arc<ControlListener>,
    tmpdir: Mutex<Option<TempDir>>,
}

impl Broker {
    pub fn new() -> Self {
        Self {
            relay: RwLock::new(None),
            init_lock: AsyncMutex::new(()),
            endpoints: RwLock::new(None),
            control: Arc::new(ControlListener::new()),
            tmpdir: Mutex::new(None),
        }
    }

    /// Привязывает сокеты и запускает proxy-цикл и цикл прослушивания.
    ///
    /// Повторный вызов ничего не делает и возвращает уже занятые адреса.
    /// В сетевом режиме фактический порт может отличаться от `port`, если
    /// пришлось перебирать альтернативные.
    pub async fn initialize(
        &self,
        port: u16,
        buffer: usize,
        local: bool,
    ) -> Result<Endpoints, PublishError> {
        let _guard = self.init_lock.lock().await;
        let existing = self.endpoints.read().clone();
        if let Some(endpoints) = existing {
            debug!("Publisher already initialized");
            return Ok(endpoints);
        }

        let (data, control, port) = if local {
            let (data, control) = self.bind_local().await?;
            (data, control, None)
        } else {
            let mut binder = TcpBinder::default();
            let pair = bind_pair(&mut binder, port, BIND_ATTEMPTS, COMM_OFFSET)
                .await
                .ok_or(PublishError::BindExhausted {
                    base_port: port,
                    attempts: BIND_ATTEMPTS,
                })?;
            (pair.data, pair.control, Some(pair.port))
        };

        let endpoints = Endpoints {
            data: data.local_endpoint()?,
            control: control.local_endpoint()?,
            port,
        };

        let (relay_tx, relay_rx) = mpsc::channel(RELAY_CAPACITY);
        tokio::spawn(run_proxy(data, relay_rx, buffer));
        self.control.start(control);

        *self.relay.write() = Some(relay_tx);
        *self.endpoints.write() = Some(endpoints.clone());
        info!(data = %endpoints.data, comm = %endpoints.control, "Publisher initialized");
        Ok(endpoints)
    }

    async fn bind_local(&self) -> Result<(TransportListener, TransportListener), PublishError> {
        let dir = tempfile::Builder::new()
            .prefix("psmon-")
            .tempdir()
            .map_err(|e| PublishError::LocalBind(e.to_string()))?;
        let data = TransportListener::bind(&Endpoint::ipc(dir.path().join("data")))
            .await
            .map_err(|e| PublishError::LocalBind(e.to_string()))?;
        let control = TransportListener::bind(&Endpoint::ipc(dir.path().join("comm")))
            .await
            .map_err(|e| PublishError::LocalBind(e.to_string()))?;
        debug!(path = %dir.path().display(), "Bound local publisher sockets");
        *self.tmpdir.lock() = Some(dir);
        Ok((data, control))
    }

    /// Публикует значение под темой `topic`.
    ///
    /// Зарезервированные темы отклоняются всегда, даже до инициализации.
    pub async fn send<T: Serialize + ?Sized>(
        &self,
        topic: &str,
        payload: &T,
    ) -> Result<(), PublishError> {
        check_topic(topic)?;
        if !self.is_initialized() {
            trace!(topic, "Publisher not initialized - dropping message");
            return Ok(());
        }
        let payload = bincode::serialize(payload)?;
        self.send_bytes(topic, Bytes::from(payload)).await
    }

    /// Публикует уже сериализованную нагрузку.
    pub async fn send_bytes(
        &self,
        topic: &str,
        payload: Bytes,
    ) -> Result<(), PublishError> {
        check_topic(topic)?;
        let Some(relay) = self.relay.read().clone() else {
            return Ok(());
        };
        let publication = Publication {
            topic: topic.to_string(),
            payload,
        };
        if relay.send(publication).await.is_err() {
            debug!(topic, "Proxy loop stopped - dropping message");
        }
        Ok(())
    }

    /// Останавливает proxy-цикл и управляющий канал.
    ///
    /// После закрытия `send` снова ничего не делает, а повторная
    /// инициализация не производится.
    pub fn close(&self) {
        if self.relay.write().take().is_some() {
            info!("Closing publisher");
        }
        self.control.stop();
    }

    pub fn is_initialized(&self) -> bool {
        self.relay.read().is_some()
    }

    pub fn endpoints(&self) -> Option<Endpoints> {
        self.endpoints.read().clone()
    }

    pub fn port(&self) -> Option<u16> {
        self.endpoints.read().as_ref().and_then(|e| e.port)
    }

    pub fn control(&self) -> &Arc<ControlListener> {
        &self.control
    }
}

/// Проверяет тему перед публикацией.
pub(crate) fn check_topic(topic: &str) -> Result<(), PublishError> {
    if is_reserved_topic(topic) {
        return Err(PublishError::ReservedTopic(topic.to_string()));
    }
    if !is_valid_topic(topic) {
        return Err(PublishError::InvalidTopic(topic.to_string()));
    }
    Ok(())
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Broker {
    fn drop(&mut self) {
        self.control.stop();
    }
}
