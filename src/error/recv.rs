use thiserror::Error;

use super::{ControlError, FrameError};

/// Ошибки потребителя.
///
/// «Нет данных» ошибкой не является: опрос в этом случае возвращает
/// `Ok(None)`. Поток данных завершается только [`RecvError::Closed`].
#[derive(Debug, Error)]
pub enum RecvError {
    #[error("data connection is closed")]
    Closed,

    #[error("subscriber is not connected")]
    NotConnected,

    #[error("operation exceeded the specified timeout")]
    Timeout,

    #[error("payload deserialization failed: {0}")]
    Decode(String),

    #[error("unable to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("control error: {0}")]
    Control(#[from] ControlError),
}

impl From<bincode::Error> for RecvError {
    fn from(err: bincode::Error) -> Self {
        RecvError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recv_error_display() {
        assert_eq!(RecvError::Closed.to_string(), "data connection is closed");
        assert_eq!(
            RecvError::Timeout.to_string(),
            "operation exceeded the specified timeout"
        );
    }

    #[test]
    fn test_control_conversion() {
        let err: RecvError = ControlError::Closed.into();
        assert!(matches!(err, RecvError::Control(ControlError::Closed)));
    }
}
