use std::collections::VecDeque;

use bytes::Bytes;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;

use crate::error::ControlError;

/// Как интерпретируется тело запроса, адресованного почтовому ящику.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageKind {
    /// Тело является строкой UTF-8.
    #[default]
    Text,
    /// Тело содержит объект, сериализованный bincode.
    Object,
}

/// Сообщение, лежащее в почтовом ящике.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailboxMessage {
    Text(String),
    Object(Bytes),
}

impl MailboxMessage {
    /// Десериализует объектное сообщение.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ControlError> {
        match self {
            MailboxMessage::Object(buf) => Ok(bincode::deserialize(buf)?),
            MailboxMessage::Text(_) => Err(ControlError::Serialization(
                "text message cannot be decoded as an object".into(),
            )),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MailboxMessage::Text(s) => Some(s),
            MailboxMessage::Object(_) => None,
        }
    }
}

/// Ограниченная неблокирующая FIFO-очередь команд.
///
/// Ёмкость задаётся при регистрации и больше не меняется; 0 означает
/// отсутствие ограничения. `put` на полной очереди не ждёт, а сообщает об
/// отказе, `get` на пустой возвращает `None`.
#[derive(Debug)]
pub struct Mailbox {
    name: String,
    kind: MessageKind,
    capacity: usize,
    items: Mutex<VecDeque<MailboxMessage>>,
}

impl Mailbox {
    pub fn new(
        name: impl Into<String>,
        capacity: usize,
        kind: MessageKind,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            capacity,
            items: Mutex::new(VecDeque::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Кладёт сообщение; `false`, если ящик полон.
    pub fn put(
        &self,
        message: MailboxMessage,
    ) -> bool {
        let mut items = self.items.lock();
        if self.capacity > 0 && items.len() >= self.capacity {
            return false;
        }
        items.push_back(message);
        true
    }

    /// Кладёт сырое тело запроса, интерпретируя его по [`MessageKind`].
    ///
    /// Текстовое тело с невалидным UTF-8 принимается с заменой символов.
    pub fn put_raw(
        &self,
        body: Bytes,
    ) -> bool {
        let message = match self.kind {
            MessageKind::Text => MailboxMessage::Text(String::from_utf8_lossy(&body).into_owned()),
            MessageKind::Object => MailboxMessage::Object(body),
        };
        self.put(message)
    }

    pub fn get(&self) -> Option<MailboxMessage> {
        self.items.lock().pop_front()
    }

    /// Извлекает и десериализует следующее сообщение.
    pub fn get_object<T: DeserializeOwned>(&self) -> Option<Result<T, ControlError>> {
        self.get().map(|message| message.decode())
    }

    pub fn size(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.size() >= self.capacity
    }
}
