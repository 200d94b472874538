use std::{marker::PhantomData, sync::Arc, time::Duration};

use bytes::Bytes;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{topic_frame, SubscriptionFrame};
use crate::{
    config::{ClientInfo, DEFAULT_RATE, TOPIC_LIST},
    control::ControlRequester,
    error::RecvError,
    network::{connect, read_message, write_message, BoxedReader, BoxedWriter, FrameQueue, TryPopError},
};

/// Минимальный период опроса в [`Subscriber::run`].
const MIN_POLL_PERIOD: Duration = Duration::from_millis(1);

/// Итог одного неблокирующего вычитывания приёмного буфера.
#[derive(Debug, Default)]
pub(crate) struct Drain {
    /// Последний вычитанный кадр.
    pub latest: Option<Bytes>,
    /// Сколько кадров вычитано.
    pub count: usize,
    /// Очередь закрыта и пуста.
    pub closed: bool,
}

impl Drain {
    fn limit_exceeded(
        &self,
        limit: usize,
    ) -> bool {
        self.count >= limit
    }
}

/// Вычитывает до `limit` кадров, оставляя только последний.
pub(crate) fn drain_latest(
    queue: &FrameQueue<Bytes>,
    limit: usize,
) -> Drain {
    let mut drain = Drain::default();
    while drain.count < limit {
        match queue.try_pop() {
            Ok(frame) => {
                drain.latest = Some(frame);
                drain.count += 1;
            }
            Err(TryPopError::Empty) => break,
            Err(TryPopError::Closed) => {
                drain.closed = true;
                break;
            }
        }
    }
    drain
}

/// Потребитель данных одной темы.
///
/// Подписывается на точное совпадение `topic + DELIM` и складывает
/// пришедшие нагрузки в приёмный буфер глубиной `ClientInfo::buffer`.
/// При переполнении теряются самые старые кадры. Каждый опрос
/// ([`Subscriber::poll_once`]) вычитывает не больше `recv_limit` кадров и
/// отдаёт только последний из них.
pub struct Subscriber<T> {
    info: ClientInfo,
    inbox: Arc<FrameQueue<Bytes>>,
    // Половина записи держит соединение открытым: её закрытие брокер
    // воспримет как отключение подписчика.
    data_writer: Mutex<Option<BoxedWriter>>,
    requester: Option<Arc<ControlRequester>>,
    reader_task: Option<JoinHandle<()>>,
    _payload: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Subscriber<T> {
    /// Создаёт неподключённого потребителя.
    pub fn new(info: ClientInfo) -> Self {
        let inbox = Arc::new(FrameQueue::new(info.buffer));
        Self {
            info,
            inbox,
            data_writer: Mutex::new(None),
            requester: None,
            reader_task: None,
            _payload: PhantomData,
        }
    }

    /// Создаёт потребителя и сразу подключает его.
    pub async fn connected(info: ClientInfo) -> Result<Self, RecvError> {
        let mut subscriber = Self::new(info);
        subscriber.connect().await?;
        Ok(subscriber)
    }

    /// Подключается к сокетам данных и управления брокера.
    ///
    /// Повторный вызов ничего не делает.
    pub async fn connect(&mut self) -> Result<(), RecvError> {
        if self.is_connected() {
            return Ok(());
        }

        let endpoint = &self.info.data_endpoint;
        let stream = connect(endpoint).await.map_err(|e| RecvError::Connect {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        let mut writer = stream.writer;
        let subscription = SubscriptionFrame::subscribe(topic_frame(&self.info.topic)).encode();
        write_message(&mut writer, &[subscription]).await?;

        let requester = ControlRequester::connect(&self.info.control_endpoint).await?;

        self.reader_task = Some(tokio::spawn(read_data(
            stream.reader,
            self.inbox.clone(),
            self.info.topic.clone(),
        )));
        *self.data_writer.lock() = Some(writer);
        self.requester = Some(Arc::new(requester));
        info!(
            topic = %self.info.topic,
            data = %self.info.data_endpoint,
            comm = %self.info.control_endpoint,
            "Subscriber connected"
        );
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.reader_task.is_some()
    }

    /// Ждёт ровно одно сообщение.
    pub async fn receive(&self) -> Result<T, RecvError> {
        if !self.is_connected() {
            return Err(RecvError::NotConnected);
        }
        let frame = self.inbox.pop().await.ok_or(RecvError::Closed)?;
        Ok(bincode::deserialize(&frame)?)
    }

    pub async fn receive_timeout(
        &self,
        timeout: Duration,
    ) -> Result<T, RecvError> {
        tokio::time::timeout(timeout, self.receive())
            .await
            .map_err(|_| RecvError::Timeout)?
    }

    /// Один опрос: вычитывает накопившиеся кадры и возвращает самый свежий.
    ///
    /// `Ok(None)` означает, что новых данных нет. Ошибка десериализации
    /// логируется и тоже даёт `Ok(None)`. `Err(RecvError::Closed)`
    /// возвращается только когда соединение закрыто и буфер пуст.
    pub fn poll_once(&self) -> Result<Option<T>, RecvError> {
        if !self.is_connected() {
            return Err(RecvError::NotConnected);
        }
        let limit = self.info.recv_limit.max(1);
        let drain = drain_latest(&self.inbox, limit);
        if drain.limit_exceeded(limit) {
            warn!(limit, topic = %self.info.topic, "Number of queued messages exceeds the discard limit");
        }

        match drain.latest {
            Some(frame) => match bincode::deserialize(&frame) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    warn!(topic = %self.info.topic, error = %e, "Failed to decode payload - skipping");
                    Ok(None)
                }
            },
            None if drain.closed => Err(RecvError::Closed),
            None => Ok(None),
        }
    }

    /// Бесконечная последовательность опросов.
    pub fn stream(&self) -> DataStream<'_, T> {
        DataStream { subscriber: self }
    }

    /// Опрашивает буфер с частотой `rate` Гц и передаёт свежие значения в
    /// `on_data`, пока соединение не закроется.
    pub async fn run<F>(
        &self,
        rate: f64,
        mut on_data: F,
    ) -> Result<(), RecvError>
    where
        F: FnMut(T),
    {
        let rate = if rate.is_finite() && rate > 0.0 { rate } else { DEFAULT_RATE };
        let period = Duration::try_from_secs_f64(1.0 / rate)
            .unwrap_or(MIN_POLL_PERIOD)
            .max(MIN_POLL_PERIOD);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            match self.poll_once() {
                Ok(Some(value)) => on_data(value),
                Ok(None) => {}
                Err(RecvError::Closed) => {
                    debug!(topic = %self.info.topic, "Data connection closed - stopping");
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Запрашивающая сторона управляющего канала.
    pub fn requester(&self) -> Option<&Arc<ControlRequester>> {
        self.requester.as_ref()
    }

    pub fn info(&self) -> &ClientInfo {
        &self.info
    }

    /// Сколько кадров ждёт в приёмном буфере.
    pub fn pending(&self) -> usize {
        self.inbox.len()
    }
}

impl Subscriber<Vec<String>> {
    /// Получает у сервера список опубликованных тем.
    pub async fn fetch_topic_list(
        info: &ClientInfo,
        timeout: Duration,
    ) -> Result<Vec<String>, RecvError> {
        let mut info = info.clone();
        info.topic = TOPIC_LIST.to_string();
        debug!(server = %info.data_endpoint, "Attempting to retrieve topic list from server");

        tokio::time::timeout(timeout, async move {
            let subscriber = Subscriber::<Vec<String>>::connected(info).await?;
            subscriber.receive().await
        })
        .await
        .map_err(|_| RecvError::Timeout)?
    }
}

impl<T> Drop for Subscriber<T> {
    fn drop(&mut self) {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        self.inbox.close();
    }
}

impl<T> std::fmt::Debug for Subscriber<T> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("info", &self.info)
            .field("pending", &self.inbox.len())
            .field("connected", &self.reader_task.is_some())
            .finish()
    }
}

/// Ленивая последовательность значений потребителя.
///
/// Каждый шаг итератора выполняет один опрос: `Some(None)` означает отсутствие
/// обновления на этом шаге, `None` означает закрытие соединения.
pub struct DataStream<'a, T> {
    subscriber: &'a Subscriber<T>,
}

impl<T: DeserializeOwned> DataStream<'_, T> {
    pub fn next_tick(&mut self) -> Result<Option<T>, RecvError> {
        self.subscriber.poll_once()
    }
}

impl<T: DeserializeOwned> Iterator for DataStream<'_, T> {
    type Item = Option<T>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.subscriber.poll_once() {
            Ok(value) => Some(value),
            Err(RecvError::Closed) | Err(RecvError::NotConnected) => None,
            Err(e) => {
                warn!(error = %e, "Data stream poll failed");
                Some(None)
            }
        }
    }
}

async fn read_data(
    mut reader: BoxedReader,
    inbox: Arc<FrameQueue<Bytes>>,
    topic: String,
) {
    loop {
        match read_message(&mut reader).await {
            Ok(Some(parts)) => {
                let [_, payload]: [Bytes; 2] = match parts.try_into() {
                    Ok(pair) => pair,
                    Err(parts) => {
                        warn!(topic = %topic, parts = parts.len(), "Unexpected data message layout - ignoring");
                        continue;
                    }
                };
                inbox.push(payload);
            }
            Ok(None) => break,
            Err(e) => {
                if !e.is_disconnect() {
                    warn!(topic = %topic, error = %e, "Data connection error");
                }
                break;
            }
        }
    }
    debug!(topic = %topic, "Data connection closed");
    inbox.close();
}
