use tracing_subscriber::EnvFilter;

use super::LoggingConfig;

/// Строит фильтр: `RUST_LOG`, если задана, иначе директива из конфигурации.
pub fn build_filter_from_config(config: &LoggingConfig) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let directive = config.build_filter_directive();
    match EnvFilter::try_new(&directive) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("Invalid log filter directive '{directive}': {e}; falling back to 'info'");
            EnvFilter::new("info")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serial_test::serial;
    use tracing_subscriber::{fmt, prelude::*, registry::Registry};

    use super::*;

    struct VecMakeWriter(Arc<Mutex<Vec<u8>>>);

    impl<'a> fmt::MakeWriter<'a> for VecMakeWriter {
        type Writer = VecWriter;

        fn make_writer(&'a self) -> Self::Writer {
            VecWriter(self.0.clone())
        }
    }

    struct VecWriter(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for VecWriter {
        fn write(
            &mut self,
            buf: &[u8],
        ) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture(
        filter: EnvFilter,
        emit: impl FnOnce(),
    ) -> String {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let layer = fmt::layer()
            .with_ansi(false)
            .with_writer(VecMakeWriter(buffer.clone()))
            .with_filter(filter);
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::with_default(subscriber, emit);
        let out = buffer.lock().unwrap();
        String::from_utf8_lossy(&out).into_owned()
    }

    #[test]
    #[serial]
    fn test_config_level_filters_events() {
        std::env::remove_var("RUST_LOG");
        let config = LoggingConfig {
            level: "warn".into(),
            ..Default::default()
        };
        let out = capture(build_filter_from_config(&config), || {
            tracing::info!("filtered info message");
            tracing::warn!("visible warn message");
        });
        assert!(out.contains("visible warn message"));
        assert!(!out.contains("filtered info message"));
    }

    #[test]
    #[serial]
    fn test_rust_log_takes_priority() {
        std::env::set_var("RUST_LOG", "error");
        let config = LoggingConfig {
            level: "debug".into(),
            ..Default::default()
        };
        let filter = build_filter_from_config(&config);
        std::env::remove_var("RUST_LOG");

        let out = capture(filter, || {
            tracing::warn!("suppressed warn message");
            tracing::error!("visible error message");
        });
        assert!(out.contains("visible error message"));
        assert!(!out.contains("suppressed warn message"));
    }
}
