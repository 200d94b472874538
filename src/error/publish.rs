use thiserror::Error;

/// Ошибки на стороне издателя.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("cannot publish data to internally reserved topic: {0}")]
    ReservedTopic(String),

    #[error("invalid topic {0:?}: must be non-empty and must not contain a NUL byte")]
    InvalidTopic(String),

    #[error("payload serialization failed: {0}")]
    Serialization(String),

    #[error("unable to bind publisher after {attempts} attempts starting at port {base_port}")]
    BindExhausted { base_port: u16, attempts: u16 },

    #[error("unable to bind local sockets for publisher: {0}")]
    LocalBind(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<bincode::Error> for PublishError {
    fn from(err: bincode::Error) -> Self {
        PublishError::Serialization(err.to_string())
    }
}
