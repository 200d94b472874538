use serde::{Deserialize, Serialize};

use super::{constants::COMM_OFFSET, Settings};
use crate::network::Endpoint;

/// Неизменяемая конфигурация потребителя.
///
/// Передаётся в [`crate::Subscriber`] при создании и после этого не
/// меняется.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Адрес сокета данных брокера.
    pub data_endpoint: Endpoint,
    /// Адрес управляющего сокета брокера.
    pub control_endpoint: Endpoint,
    /// Глубина приёмного буфера в сообщениях (0 означает без ограничения).
    pub buffer: usize,
    /// Желаемая частота обновления, Гц.
    pub rate: f64,
    /// Максимум кадров, вычитываемых за один опрос.
    pub recv_limit: usize,
    /// Тема, на которую подписывается потребитель.
    pub topic: String,
    /// Тег отрисовщика.
    pub renderer: String,
    /// Фоновый режим.
    pub daemon: bool,
}

impl ClientInfo {
    pub fn new(
        data_endpoint: Endpoint,
        control_endpoint: Endpoint,
        topic: impl Into<String>,
    ) -> Self {
        let defaults = Settings::default();
        Self {
            data_endpoint,
            control_endpoint,
            buffer: defaults.buffer,
            rate: defaults.rate,
            recv_limit: defaults.recv_limit,
            topic: topic.into(),
            renderer: defaults.renderer,
            daemon: defaults.daemon,
        }
    }

    /// Строит конфигурацию сетевого потребителя из настроек: данные на
    /// `tcp://server:port`, управление на `tcp://server:port+COMM_OFFSET`.
    pub fn from_settings(
        settings: &Settings,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            data_endpoint: Endpoint::tcp(&settings.server, settings.port),
            control_endpoint: Endpoint::tcp(
                &settings.server,
                settings.port.saturating_add(COMM_OFFSET),
            ),
            buffer: settings.buffer,
            rate: settings.rate,
            recv_limit: settings.recv_limit,
            topic: topic.into(),
            renderer: settings.renderer.clone(),
            daemon: settings.daemon,
        }
    }

    pub fn with_buffer(
        mut self,
        buffer: usize,
    ) -> Self {
        self.buffer = buffer;
        self
    }

    pub fn with_recv_limit(
        mut self,
        recv_limit: usize,
    ) -> Self {
        self.recv_limit = recv_limit;
        self
    }

    pub fn with_rate(
        mut self,
        rate: f64,
    ) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_daemon(
        mut self,
        daemon: bool,
    ) -> Self {
        self.daemon = daemon;
        self
    }
}
