//! Конфигурация ретранслятора.
//!
//! - `constants`: зарезервированные имена, разделители и значения по
//!   умолчанию транспортного уровня.
//! - `settings`: настройки процесса, загружаемые через крейт `config`.
//! - `client_info`: неизменяемая конфигурация потребителя.

pub mod client_info;
pub mod constants;
pub mod settings;

pub use client_info::ClientInfo;
pub use constants::*;
pub use settings::Settings;
