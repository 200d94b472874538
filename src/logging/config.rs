use std::{fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

/// Переменная окружения с уровнем логирования.
pub const LOG_LEVEL_ENV: &str = "PSMON_LOG_LEVEL";
/// Переменная окружения с форматом консольного вывода.
pub const LOG_FORMAT_ENV: &str = "PSMON_LOG_FORMAT";

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Формат вывода событий.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        };
        f.write_str(name)
    }
}

/// Настройки консольного вывода.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    pub format: LogFormat,
    pub with_ansi: bool,
    pub with_target: bool,
    pub with_thread_ids: bool,
    pub with_line_numbers: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Compact,
            with_ansi: true,
            with_target: true,
            with_thread_ids: false,
            with_line_numbers: false,
        }
    }
}

/// Настройки файлового вывода: ежедневная ротация в `log_dir`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    pub filename: String,
    pub format: LogFormat,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            filename: "psmon.log".to_string(),
            format: LogFormat::Json,
        }
    }
}

/// Конфигурация логирования.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Уровень по умолчанию: trace, debug, info, warn или error.
    pub level: String,
    pub console_enabled: bool,
    pub console: ConsoleConfig,
    pub file_enabled: bool,
    pub file: FileConfig,
    pub log_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_enabled: true,
            console: ConsoleConfig::default(),
            file_enabled: false,
            file: FileConfig::default(),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl LoggingConfig {
    /// Применяет `PSMON_LOG_LEVEL` и `PSMON_LOG_FORMAT`.
    ///
    /// Некорректный формат из окружения игнорируется.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
            self.level = level.to_ascii_lowercase();
        }
        if let Ok(format) = std::env::var(LOG_FORMAT_ENV) {
            match format.parse() {
                Ok(format) => self.console.format = format,
                Err(e) => eprintln!("Ignoring {LOG_FORMAT_ENV}: {e}"),
            }
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !LEVELS.contains(&self.level.as_str()) {
            return Err(format!("invalid log level '{}'", self.level));
        }
        if self.file_enabled && self.file.filename.trim().is_empty() {
            return Err("log file name must not be empty".to_string());
        }
        Ok(())
    }

    pub fn ensure_log_dir(&self) -> std::io::Result<()> {
        if self.file_enabled {
            std::fs::create_dir_all(&self.log_dir)?;
        }
        Ok(())
    }

    /// Директива `EnvFilter`: уровень для крейта и общий уровень.
    pub fn build_filter_directive(&self) -> String {
        format!("psmon_relay={level},{level}", level = self.level)
    }
}
