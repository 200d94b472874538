//! Управляющий канал: обратная связь от потребителей к издателю.
//!
//! - `mailbox`: именованные ограниченные очереди команд.
//! - `listener`: серверная сторона протокола запрос/ответ, флаг сброса.
//! - `requester`: клиентская сторона с объединением сигналов сброса.

pub mod listener;
pub mod mailbox;
pub mod requester;

pub use listener::ControlListener;
pub use mailbox::{Mailbox, MailboxMessage, MessageKind};
pub use requester::ControlRequester;
