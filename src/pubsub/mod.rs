//! Подсистема распространения данных.
//!
//! - `broker`: публичный API издателя, привязка сокетов и запуск
//!   proxy-цикла.
//! - `cache`: кэш последних значений по темам и список тем.
//! - `message`: фреймы темы и фреймы уведомлений о подписке.
//! - `proxy` (приватный): единственный писатель публичного сокета данных.
//! - `subscriber`: потребитель с фильтром темы и политикой сброса
//!   устаревших кадров.
//!
//! Публичный API переэкспортирует:
//! - `broker::*`
//! - `cache::*`
//! - `message::*`
//! - `subscriber::*`

pub mod broker;
pub mod cache;
pub mod message;
mod proxy;
pub mod subscriber;

pub use broker::*;
pub use cache::*;
pub use message::*;
pub use subscriber::*;
