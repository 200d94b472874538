use thiserror::Error;

use super::FrameError;

/// Ошибки управляющего канала.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("message handler '{0}' already registered")]
    DuplicateHandler(String),

    #[error("unable to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("malformed reply: {0}")]
    MalformedReply(String),

    #[error("control connection closed")]
    Closed,

    #[error("control exchange aborted: {0}")]
    Aborted(String),

    #[error("message serialization failed: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for ControlError {
    fn from(err: std::io::Error) -> Self {
        ControlError::Frame(FrameError::Io(err))
    }
}

impl From<bincode::Error> for ControlError {
    fn from(err: bincode::Error) -> Self {
        ControlError::Serialization(err.to_string())
    }
}
