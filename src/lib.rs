//! Ретранслятор живых данных по темам.
//!
//! Один производящий процесс публикует снимки данных под именами тем,
//! произвольное число потребителей подписывается на них. Новый подписчик
//! сразу получает последнее значение темы. Потребители могут отправлять
//! издателю сигнал сброса и команды в именованные почтовые ящики.

/// Настройки, конфигурация потребителя и протокольные константы.
pub mod config;
/// Управляющий канал: почтовые ящики, слушатель, запрашивающая сторона.
pub mod control;
/// Типы ошибок по подсистемам.
pub mod error;
/// Логирование (форматы, фильтры, консольный и файловый вывод).
pub mod logging;
/// Адреса, кодек кадров, транспорт, подбор портов.
pub mod network;
/// Служба публикации.
pub mod publisher;
/// Брокер, кэш последних значений, потребитель.
pub mod pubsub;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

pub use config::{ClientInfo, Settings};
pub use control::{ControlListener, ControlRequester, Mailbox, MailboxMessage, MessageKind};
pub use error::{ControlError, FrameError, PublishError, RecvError};
pub use logging::{init_logging, LoggingConfig, LoggingHandle};
pub use network::Endpoint;
pub use publisher::Publisher;
pub use pubsub::{Broker, DataStream, Endpoints, LastValueCache, Subscriber};
