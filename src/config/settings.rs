use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

use super::constants::{
    DEFAULT_BUFFER, DEFAULT_PORT, DEFAULT_RATE, DEFAULT_RECV_LIMIT, DEFAULT_RENDERER,
    DEFAULT_SERVER, DEFAULT_TIMEOUT,
};

/// Настройки транспорта, общие для издателя и потребителей.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Хост, к которому подключаются потребители.
    pub server: String,
    /// Базовый порт данных (управляющий порт = `port + COMM_OFFSET`).
    pub port: u16,
    /// Глубина буфера (high-water mark) в сообщениях.
    pub buffer: usize,
    /// Публиковать через локальный транспорт вместо TCP.
    pub local: bool,
    /// Желаемая частота обновления потребителя, Гц.
    pub rate: f64,
    /// Сколько кадров потребитель вычитывает за один опрос.
    pub recv_limit: usize,
    /// Тег отрисовщика, передаётся потребителям как есть.
    pub renderer: String,
    /// Фоновый режим потребителя.
    pub daemon: bool,
    /// Таймаут ожидания ответа сервера, секунды.
    pub timeout_secs: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            port: DEFAULT_PORT,
            buffer: DEFAULT_BUFFER,
            local: false,
            rate: DEFAULT_RATE,
            recv_limit: DEFAULT_RECV_LIMIT,
            renderer: DEFAULT_RENDERER.to_string(),
            daemon: false,
            timeout_secs: DEFAULT_TIMEOUT.as_secs_f64(),
        }
    }
}

impl Settings {
    /// Загружает настройки: значения по умолчанию, поверх них переменные
    /// окружения с префиксом `PSMON_` (например `PSMON_PORT=13000`).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Environment::with_prefix("PSMON"))
    }

    fn load_from(env: Environment) -> Result<Self, ConfigError> {
        let defaults = Settings::default();
        let cfg = Config::builder()
            .set_default("server", defaults.server)?
            .set_default("port", defaults.port)?
            .set_default("buffer", defaults.buffer as u64)?
            .set_default("local", defaults.local)?
            .set_default("rate", defaults.rate)?
            .set_default("recv_limit", defaults.recv_limit as u64)?
            .set_default("renderer", defaults.renderer)?
            .set_default("daemon", defaults.daemon)?
            .set_default("timeout_secs", defaults.timeout_secs)?
            .add_source(env.try_parsing(true))
            .build()?;

        cfg.try_deserialize()
    }

    /// Таймаут ожидания сервера; непредставимое значение заменяется
    /// значением по умолчанию.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs.max(0.0)).unwrap_or(DEFAULT_TIMEOUT)
    }
}
