use std::{fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Хост, означающий «все интерфейсы» при привязке.
pub const ANY_HOST: &str = "*";

/// Адрес сокета ретранслятора.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    /// `tcp://host:port`
    Tcp { host: String, port: u16 },
    /// `ipc://path`: локальный сокет в файловой системе.
    Ipc(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointParseError {
    #[error("unsupported endpoint scheme: {0}")]
    UnsupportedScheme(String),

    #[error("endpoint is missing a port: {0}")]
    MissingPort(String),

    #[error("invalid port in endpoint: {0}")]
    InvalidPort(String),

    #[error("endpoint has an empty address: {0}")]
    Empty(String),
}

impl Endpoint {
    pub fn tcp(
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Endpoint::Tcp {
            host: host.into(),
            port,
        }
    }

    pub fn ipc(path: impl Into<PathBuf>) -> Self {
        Endpoint::Ipc(path.into())
    }

    pub fn port(&self) -> Option<u16> {
        match self {
            Endpoint::Tcp { port, .. } => Some(*port),
            Endpoint::Ipc(_) => None,
        }
    }

    /// Адрес для `bind`: `*` превращается в `0.0.0.0`.
    pub(crate) fn bind_host(&self) -> Option<&str> {
        match self {
            Endpoint::Tcp { host, .. } if host == ANY_HOST => Some("0.0.0.0"),
            Endpoint::Tcp { host, .. } => Some(host.as_str()),
            Endpoint::Ipc(_) => None,
        }
    }

    /// Адрес для `connect`: к «любому» адресу подключаемся через loopback.
    pub(crate) fn connect_host(&self) -> Option<&str> {
        match self {
            Endpoint::Tcp { host, .. } if host == ANY_HOST || host == "0.0.0.0" => {
                Some("127.0.0.1")
            }
            Endpoint::Tcp { host, .. } => Some(host.as_str()),
            Endpoint::Ipc(_) => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Endpoint::Tcp { host, port } => write!(f, "tcp://{host}:{port}"),
            Endpoint::Ipc(path) => write!(f, "ipc://{}", path.display()),
        }
    }
}

impl FromStr for Endpoint {
    type Err = EndpointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix("tcp://") {
            let (host, port) = rest
                .rsplit_once(':')
                .ok_or_else(|| EndpointParseError::MissingPort(s.to_string()))?;
            if host.is_empty() {
                return Err(EndpointParseError::Empty(s.to_string()));
            }
            let port = port
                .parse::<u16>()
                .map_err(|_| EndpointParseError::InvalidPort(s.to_string()))?;
            Ok(Endpoint::tcp(host, port))
        } else if let Some(path) = s.strip_prefix("ipc://") {
            if path.is_empty() {
                return Err(EndpointParseError::Empty(s.to_string()));
            }
            Ok(Endpoint::ipc(path))
        } else {
            Err(EndpointParseError::UnsupportedScheme(s.to_string()))
        }
    }
}
