//! Proxy-цикл брокера.
//!
//! Единственная задача, маршрутизирующая данные подписчикам. Мультиплексирует
//! три источника событий: внутренний канал публикаций, новые подключения к
//! публичному сокету данных и уведомления о подписке от подписчиков.
//! Каждому подписчику соответствует собственная очередь отправки, которую
//! вычитывает отдельная задача-писатель; в очередь пишет только этот цикл.

use std::{collections::HashMap, sync::Arc};

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use super::{filter_matches, topic_frame, LastValueCache, SubscriptionFrame, SubscriptionKind};
use crate::{
    config::TOPIC_LIST,
    network::{read_message, write_message, BoxedReader, BoxedWriter, FrameQueue, TransportListener},
};

/// Глубина очереди событий от задач-читателей подписчиков.
const PEER_EVENT_CAPACITY: usize = 256;

type WireMessage = Arc<[Bytes]>;

/// Публикация, переданная из `Broker::send` в proxy-цикл.
#[derive(Debug)]
pub(crate) struct Publication {
    pub topic: String,
    pub payload: Bytes,
}

#[derive(Debug)]
enum PeerEvent {
    Frame { peer: u64, frame: Bytes },
    Closed { peer: u64 },
}

struct Peer {
    filters: Vec<Bytes>,
    queue: Arc<FrameQueue<WireMessage>>,
}

/// Состояние, которым владеет proxy-цикл: подписчики и кэш.
pub(crate) struct ProxyState {
    peers: HashMap<u64, Peer>,
    cache: LastValueCache,
    buffer: usize,
    next_peer: u64,
}

impl ProxyState {
    pub(crate) fn new(buffer: usize) -> Self {
        Self {
            peers: HashMap::new(),
            cache: LastValueCache::new(),
            buffer,
            next_peer: 0,
        }
    }

    /// Регистрирует подписчика и возвращает его идентификатор и очередь.
    fn add_peer(&mut self) -> (u64, Arc<FrameQueue<WireMessage>>) {
        let id = self.next_peer;
        self.next_peer += 1;
        let queue = Arc::new(FrameQueue::new(self.buffer));
        self.peers.insert(
            id,
            Peer {
                filters: Vec::new(),
                queue: queue.clone(),
            },
        );
        (id, queue)
    }

    fn remove_peer(
        &mut self,
        id: u64,
    ) {
        if let Some(peer) = self.peers.remove(&id) {
            peer.queue.close();
            debug!(peer = id, "Subscriber disconnected");
        }
    }

    /// Отправляет публикацию подписчикам и обновляет кэш.
    fn publish(
        &mut self,
        publication: Publication,
    ) {
        let Publication { topic, payload } = publication;
        debug!(topic = %topic, "Received data on relay channel");

        let message: WireMessage = Arc::new([topic_frame(&topic), payload.clone()]);
        self.route(&message);

        if let Some(list) = self.cache.update(&topic, payload) {
            debug!(topic = %topic, "New topic - republishing topic list");
            let message: WireMessage = Arc::new([topic_frame(TOPIC_LIST), list]);
            self.route(&message);
        }
    }

    fn route(
        &self,
        message: &WireMessage,
    ) {
        for (id, peer) in &self.peers {
            if peer.filters.iter().any(|f| filter_matches(f, &message[0])) && peer.queue.push(message.clone()) {
                trace!(peer = id, "Subscriber send buffer full - dropped oldest message");
            }
        }
    }

    /// Обрабатывает уведомление о подписке от подписчика `id`.
    fn handle_frame(
        &mut self,
        id: u64,
        frame: Bytes,
    ) {
        let Some(peer) = self.peers.get_mut(&id) else {
            return;
        };
        let Some(sub) = SubscriptionFrame::parse(&frame) else {
            warn!(peer = id, "Received malformed subscription frame - ignoring!");
            return;
        };

        match sub.kind {
            SubscriptionKind::Subscribe => {
                peer.filters.push(sub.filter.clone());
                let Some(topic) = sub.topic() else {
                    warn!(peer = id, "Received new subscription message for invalid topic - ignoring!");
                    return;
                };
                debug!(peer = id, topic, "Received subscription message");
                match self.cache.get(topic) {
                    Some(cached) => {
                        debug!(peer = id, topic, "Found cached message to resend");
                        let message: WireMessage = Arc::new([topic_frame(topic), cached.clone()]);
                        peer.queue.push(message);
                    }
                    None => debug!(peer = id, topic, "No cached message found"),
                }
            }
            SubscriptionKind::Unsubscribe => {
                if let Some(pos) = peer.filters.iter().position(|f| *f == sub.filter) {
                    peer.filters.remove(pos);
                    debug!(peer = id, "Removed subscription");
                }
            }
        }
    }

    #[cfg(test)]
    fn cache(&self) -> &LastValueCache {
        &self.cache
    }

    fn close_all(&mut self) {
        for (_, peer) in self.peers.drain() {
            peer.queue.close();
        }
    }
}

/// Цикл работает, пока жив хотя бы один отправитель канала публикаций.
/// Закрытие канала (`Broker::close` или `Drop` брокера) завершает цикл и
/// закрывает публичный сокет данных.
pub(crate) async fn run_proxy(
    listener: TransportListener,
    mut relay_rx: mpsc::Receiver<Publication>,
    buffer: usize,
) {
    let (events_tx, mut events_rx) = mpsc::channel::<PeerEvent>(PEER_EVENT_CAPACITY);
    let mut state = ProxyState::new(buffer);

    loop {
        tokio::select! {
            publication = relay_rx.recv() => match publication {
                Some(publication) => state.publish(publication),
                None => break,
            },
            accepted = listener.accept() => match accepted {
                Ok(stream) => {
                    let (id, queue) = state.add_peer();
                    debug!(peer = id, addr = %stream.peer, "Subscriber connected");
                    tokio::spawn(peer_writer(id, stream.writer, queue));
                    tokio::spawn(peer_reader(id, stream.reader, events_tx.clone()));
                }
                Err(e) => warn!(error = %e, "Failed to accept subscriber connection"),
            },
            Some(event) = events_rx.recv() => match event {
                PeerEvent::Frame { peer, frame } => state.handle_frame(peer, frame),
                PeerEvent::Closed { peer } => state.remove_peer(peer),
            },
        }
    }

    state.close_all();
    info!("Publisher proxy loop stopped");
}

async fn peer_reader(
    id: u64,
    mut reader: BoxedReader,
    events: mpsc::Sender<PeerEvent>,
) {
    loop {
        match read_message(&mut reader).await {
            Ok(Some(parts)) => {
                if parts.len() != 1 {
                    warn!(peer = id, parts = parts.len(), "Unexpected subscription message layout - ignoring!");
                    continue;
                }
                let frame = parts.into_iter().next().unwrap_or_default();
                if events.send(PeerEvent::Frame { peer: id, frame }).await.is_err() {
                    return;
                }
            }
            Ok(None) => break,
            Err(e) => {
                if !e.is_disconnect() {
                    warn!(peer = id, error = %e, "Subscriber connection error");
                }
                break;
            }
        }
    }
    let _ = events.send(PeerEvent::Closed { peer: id }).await;
}

async fn peer_writer(
    id: u64,
    mut writer: BoxedWriter,
    queue: Arc<FrameQueue<WireMessage>>,
) {
    while let Some(message) = queue.pop().await {
        if let Err(e) = write_message(&mut writer, &message).await {
            debug!(peer = id, error = %e, "Failed to write to subscriber");
            queue.close();
            break;
        }
    }
}
