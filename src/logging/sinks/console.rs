use std::io::{self, Stdout};

use tracing_subscriber::{layer::Layer as LayerTrait, registry::LookupSpan};

use crate::logging::{formatter, LoggingConfig};

/// Консольный слой в формате из конфигурации.
pub fn layer_with_config<S>(config: &LoggingConfig) -> Box<dyn LayerTrait<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let writer: fn() -> Stdout = io::stdout;
    formatter::build_formatter(
        config.console.format,
        &config.console,
        writer,
        config.console.with_ansi,
    )
}

#[cfg(test)]
mod tests {
    use tracing::info;
    use tracing_subscriber::{prelude::*, registry::Registry};

    use super::*;
    use crate::logging::LogFormat;

    #[test]
    fn test_every_format_builds_and_logs() {
        for format in [LogFormat::Compact, LogFormat::Pretty, LogFormat::Json] {
            let mut config = LoggingConfig::default();
            config.console.format = format;
            config.console.with_ansi = false;

            let subscriber = Registry::default().with(layer_with_config::<Registry>(&config));
            tracing::subscriber::with_default(subscriber, || {
                info!(%format, "console layer smoke test");
            });
        }
    }
}
