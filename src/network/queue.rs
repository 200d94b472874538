use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Результат неблокирующего извлечения из пустой или закрытой очереди.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryPopError {
    /// Сейчас данных нет, но очередь жива.
    Empty,
    /// Очередь закрыта и полностью вычитана.
    Closed,
}

/// Ограниченная FIFO-очередь кадров с вытеснением самых старых.
///
/// Моделирует high-water mark сокета: при переполнении теряются старые
/// кадры, поэтому последнее значение всегда доходит до читателя.
/// Ёмкость 0 означает отсутствие ограничения. Рассчитана на одного
/// читателя.
#[derive(Debug)]
pub struct FrameQueue<T> {
    state: Mutex<QueueState<T>>,
    notify: Notify,
    capacity: usize,
}

#[derive(Debug)]
struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
    evicted: u64,
}

impl<T> FrameQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity.min(1024)),
                closed: false,
                evicted: 0,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Кладёт элемент в конец очереди.
    ///
    /// Возвращает `true`, если ради него был вытеснен самый старый элемент.
    /// В закрытую очередь ничего не кладётся.
    pub fn push(
        &self,
        item: T,
    ) -> bool {
        let evicted = {
            let mut state = self.state.lock();
            if state.closed {
                return false;
            }
            let evicted = self.capacity > 0 && state.items.len() >= self.capacity;
            if evicted {
                state.items.pop_front();
                state.evicted += 1;
            }
            state.items.push_back(item);
            evicted
        };
        self.notify.notify_one();
        evicted
    }

    /// Неблокирующее извлечение. Оставшиеся элементы закрытой очереди
    /// выдаются до того, как вернётся [`TryPopError::Closed`].
    pub fn try_pop(&self) -> Result<T, TryPopError> {
        let mut state = self.state.lock();
        match state.items.pop_front() {
            Some(item) => Ok(item),
            None if state.closed => Err(TryPopError::Closed),
            None => Err(TryPopError::Empty),
        }
    }

    /// Ждёт следующий элемент; `None`, если очередь закрыта и пуста.
    pub async fn pop(&self) -> Option<T> {
        loop {
            match self.try_pop() {
                Ok(item) => return Some(item),
                Err(TryPopError::Closed) => return None,
                Err(TryPopError::Empty) => self.notify.notified().await,
            }
        }
    }

    pub fn close(&self) {
        self.state.lock().closed = true;
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Сколько элементов было вытеснено за всё время.
    pub fn evicted(&self) -> u64 {
        self.state.lock().evicted
    }
}
