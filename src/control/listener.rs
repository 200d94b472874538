use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use bytes::Bytes;
use dashmap::{mapref::entry::Entry, DashMap};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, Notify};
use tracing::{debug, info, warn};

use super::{Mailbox, MessageKind};
use crate::{
    config::{
        reset_reply, HANDLER_FULL_REPLY, HANDLER_PROCESSED_REPLY, INVALID_REQUEST_REPLY,
        RESET_HEADER, RESET_REQUEST_PREFIX, UNKNOWN_HANDLER_REPLY,
    },
    error::ControlError,
    network::{read_message, write_message, BoxedReader, BoxedWriter, TransportListener, TransportStream},
};

/// Глубина очереди запросов от соединений к циклу прослушивания.
const REQUEST_QUEUE_CAPACITY: usize = 64;

type PendingRequest = (Vec<Bytes>, oneshot::Sender<[Bytes; 2]>);

/// Серверная сторона управляющего канала.
///
/// Разбирает запросы `(header, body)` и отвечает ровно одним
/// `(header, body)` на каждый. Заголовок сброса выставляет флаг сброса,
/// заголовок с именем зарегистрированного почтового ящика кладёт тело в
/// этот ящик. Разбор запросов выполняет единственная задача цикла
/// прослушивания; каждое соединение обслуживается своей задачей, которая
/// пишет ответы только в свой сокет.
#[derive(Debug, Default)]
pub struct ControlListener {
    handlers: DashMap<String, Arc<Mailbox>>,
    reset_flag: AtomicBool,
    running: AtomicBool,
    shutdown: Mutex<Option<Arc<Notify>>>,
}

impl ControlListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Регистрирует почтовый ящик под именем `name`.
    ///
    /// Повторная регистрация того же имени считается ошибкой вызывающего.
    pub fn register_handler(
        &self,
        name: &str,
        capacity: usize,
        kind: MessageKind,
    ) -> Result<Arc<Mailbox>, ControlError> {
        debug!(name, capacity, ?kind, "Attempting to register message handler");
        match self.handlers.entry(name.to_string()) {
            Entry::Occupied(_) => {
                warn!(name, "Attempted to register message handler which already exists");
                Err(ControlError::DuplicateHandler(name.to_string()))
            }
            Entry::Vacant(slot) => {
                let mailbox = Arc::new(Mailbox::new(name, capacity, kind));
                slot.insert(mailbox.clone());
                info!(name, "Successfully registered message handler");
                Ok(mailbox)
            }
        }
    }

    pub fn get_handler(
        &self,
        name: &str,
    ) -> Option<Arc<Mailbox>> {
        self.handlers.get(name).map(|entry| entry.value().clone())
    }

    /// Текущий уровень флага сброса; чтение флаг не сбрасывает.
    pub fn reset_flag(&self) -> bool {
        self.reset_flag.load(Ordering::Acquire)
    }

    pub fn clear_reset_flag(&self) {
        self.reset_flag.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Запускает цикл прослушивания на `listener`.
    ///
    /// Возвращает `false`, если цикл уже запущен; переданный сокет в этом
    /// случае закрывается.
    pub fn start(
        self: &Arc<Self>,
        listener: TransportListener,
    ) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Control listener already running");
            return false;
        }
        let shutdown = Arc::new(Notify::new());
        *self.shutdown.lock() = Some(shutdown.clone());
        tokio::spawn(self.clone().listen(listener, shutdown));
        true
    }

    /// Останавливает цикл прослушивания и закрывает управляющий сокет.
    pub fn stop(&self) {
        if let Some(shutdown) = self.shutdown.lock().take() {
            shutdown.notify_one();
        }
    }

    async fn listen(
        self: Arc<Self>,
        listener: TransportListener,
        shutdown: Arc<Notify>,
    ) {
        let (requests_tx, mut requests_rx) = mpsc::channel::<PendingRequest>(REQUEST_QUEUE_CAPACITY);
        info!("Control listener started");

        loop {
            tokio::select! {
                _ = shutdown.notified() => break,
                accepted = listener.accept() => match accepted {
                    Ok(TransportStream { reader, writer, peer }) => {
                        debug!(peer = %peer, "Control client connected");
                        tokio::spawn(serve_connection(reader, writer, requests_tx.clone()));
                    }
                    Err(e) => warn!(error = %e, "Failed to accept control connection"),
                },
                Some((parts, reply_tx)) = requests_rx.recv() => {
                    let _ = reply_tx.send(self.dispatch(parts));
                }
            }
        }

        self.running.store(false, Ordering::Release);
        info!("Control listener stopped");
    }

    /// Обрабатывает один запрос и формирует ответ.
    pub fn dispatch(
        &self,
        parts: Vec<Bytes>,
    ) -> [Bytes; 2] {
        let [header, body]: [Bytes; 2] = match parts.try_into() {
            Ok(pair) => pair,
            Err(parts) => {
                warn!(parts = parts.len(), "Malformed request received on comm port");
                let header = parts.into_iter().next().unwrap_or_default();
                return [header, Bytes::from_static(INVALID_REQUEST_REPLY.as_bytes())];
            }
        };
        let name = String::from_utf8_lossy(&header).into_owned();

        if name == RESET_HEADER {
            let request = String::from_utf8_lossy(&body);
            return match request.strip_prefix(RESET_REQUEST_PREFIX) {
                Some(client_id) => {
                    self.reset_flag.store(true, Ordering::Release);
                    info!(request = %request, "Received valid reset request");
                    [header, Bytes::from(reset_reply(client_id))]
                }
                None => {
                    warn!(request = %request, "Invalid request received on comm port");
                    [header, Bytes::from_static(INVALID_REQUEST_REPLY.as_bytes())]
                }
            };
        }

        let reply = match self.get_handler(&name) {
            Some(mailbox) => {
                if mailbox.put_raw(body) {
                    debug!(handler = %name, "Message for handler processed");
                    HANDLER_PROCESSED_REPLY
                } else {
                    warn!(handler = %name, "Message handler is full - request dropped");
                    HANDLER_FULL_REPLY
                }
            }
            None => {
                debug!(handler = %name, "Received message for unregistered handler");
                UNKNOWN_HANDLER_REPLY
            }
        };
        [header, Bytes::from_static(reply.as_bytes())]
    }
}

/// Читает запросы одного клиента и пишет ответы строго по одному на запрос.
async fn serve_connection(
    mut reader: BoxedReader,
    mut writer: BoxedWriter,
    requests: mpsc::Sender<PendingRequest>,
) {
    loop {
        let parts = match read_message(&mut reader).await {
            Ok(Some(parts)) => parts,
            Ok(None) => break,
            Err(e) => {
                if !e.is_disconnect() {
                    warn!(error = %e, "Control connection error");
                }
                break;
            }
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        if requests.send((parts, reply_tx)).await.is_err() {
            break;
        }
        let Ok(reply) = reply_rx.await else {
            break;
        };
        if let Err(e) = write_message(&mut writer, &reply).await {
            debug!(error = %e, "Failed to write control reply");
            break;
        }
    }
    debug!("Control client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::reset_request;

    fn request(
        header: &str,
        body: &str,
    ) -> Vec<Bytes> {
        vec![
            Bytes::copy_from_slice(header.as_bytes()),
            Bytes::copy_from_slice(body.as_bytes()),
        ]
    }

    #[test]
    fn test_valid_reset_sets_flag() {
        let listener = ControlListener::new();
        let [header, body] = listener.dispatch(request(RESET_HEADER, &reset_request("host1")));
        assert_eq!(&header[..], RESET_HEADER.as_bytes());
        assert_eq!(&body[..], reset_reply("host1").as_bytes());
        assert!(listener.reset_flag());
        // уровень, а не фронт: повторное чтение флаг не сбрасывает
        assert!(listener.reset_flag());
        listener.clear_reset_flag();
        assert!(!listener.reset_flag());
    }

    #[test]
    fn test_invalid_reset_body() {
        let listener = ControlListener::new();
        let [_, body] = listener.dispatch(request(RESET_HEADER, "please reset"));
        assert_eq!(&body[..], INVALID_REQUEST_REPLY.as_bytes());
        assert!(!listener.reset_flag());
    }

    #[test]
    fn test_mailbox_overflow_reply() {
        let listener = ControlListener::new();
        let mailbox = listener.register_handler("cmd", 2, MessageKind::Text).unwrap();
        let replies: Vec<_> = (0..3)
            .map(|i| listener.dispatch(request("cmd", &format!("m{i}")))[1].clone())
            .collect();
        assert_eq!(&replies[0][..], HANDLER_PROCESSED_REPLY.as_bytes());
        assert_eq!(&replies[1][..], HANDLER_PROCESSED_REPLY.as_bytes());
        assert_eq!(&replies[2][..], HANDLER_FULL_REPLY.as_bytes());
        assert_eq!(mailbox.size(), 2);
    }

    #[test]
    fn test_unknown_header_is_answered() {
        let listener = ControlListener::new();
        let [header, body] = listener.dispatch(request("nobody", "x"));
        assert_eq!(&header[..], b"nobody");
        assert_eq!(&body[..], UNKNOWN_HANDLER_REPLY.as_bytes());
    }

    #[test]
    fn test_malformed_request_is_answered() {
        let listener = ControlListener::new();
        let [header, body] = listener.dispatch(vec![Bytes::from_static(b"only")]);
        assert_eq!(&header[..], b"only");
        assert_eq!(&body[..], INVALID_REQUEST_REPLY.as_bytes());
        let [header, _] = listener.dispatch(Vec::new());
        assert!(header.is_empty());
    }

    #[test]
    fn test_duplicate_handler() {
        let listener = ControlListener::new();
        listener.register_handler("cmd", 1, MessageKind::Text).unwrap();
        let err = listener.register_handler("cmd", 5, MessageKind::Object).unwrap_err();
        assert!(matches!(err, ControlError::DuplicateHandler(name) if name == "cmd"));
        assert_eq!(listener.get_handler("cmd").unwrap().capacity(), 1);
        assert!(listener.get_handler("other").is_none());
    }
}
