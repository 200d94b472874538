use std::io;

use thiserror::Error;

/// Ошибки кодека многочастных сообщений.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("message has too many parts: {count} (max {max})")]
    TooManyParts { count: u32, max: u32 },

    #[error("message part is too large: {len} bytes (max {max})")]
    PartTooLarge { len: u32, max: u32 },

    #[error("connection closed in the middle of a message")]
    Truncated,
}

impl FrameError {
    /// Ошибка означает, что соединение больше непригодно.
    pub fn is_disconnect(&self) -> bool {
        match self {
            FrameError::Truncated => true,
            FrameError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}
