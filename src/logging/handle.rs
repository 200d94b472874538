use std::time::{Duration, Instant};

use tracing_appender::non_blocking::WorkerGuard;

/// Управляет временем жизни неблокирующих писателей логов.
///
/// Пока handle жив, фоновый поток файлового писателя работает; при
/// `shutdown` или `Drop` буферы сбрасываются.
#[derive(Debug)]
pub struct LoggingHandle {
    file_guard: Option<WorkerGuard>,
    flush_timeout: Duration,
}

impl LoggingHandle {
    pub fn new(file_guard: Option<WorkerGuard>) -> Self {
        Self {
            file_guard,
            flush_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_flush_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.flush_timeout = timeout;
        self
    }

    pub fn has_file_sink(&self) -> bool {
        self.file_guard.is_some()
    }

    /// Сбрасывает файловый писатель и сообщает, уложился ли он в таймаут.
    pub fn shutdown(mut self) -> bool {
        tracing::info!(
            timeout_ms = self.flush_timeout.as_millis() as u64,
            "Initiating logging shutdown"
        );
        let start = Instant::now();
        drop(self.file_guard.take());
        let elapsed = start.elapsed();

        if elapsed > self.flush_timeout {
            eprintln!(
                "WARNING: Logging shutdown took {}ms (timeout: {}ms)",
                elapsed.as_millis(),
                self.flush_timeout.as_millis()
            );
            false
        } else {
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_without_file_sink() {
        let handle = LoggingHandle::new(None).with_flush_timeout(Duration::from_secs(1));
        assert!(!handle.has_file_sink());
        assert!(handle.shutdown());
    }

    #[test]
    fn test_shutdown_flushes_file_guard() {
        let dir = tempfile::tempdir().unwrap();
        let (_writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir.path(), "x.log"));
        let handle = LoggingHandle::new(Some(guard));
        assert!(handle.has_file_sink());
        assert!(handle.shutdown());
    }
}
