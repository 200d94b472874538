use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling::daily};
use tracing_subscriber::{layer::Layer as LayerTrait, registry::LookupSpan};

use crate::logging::{formatter, LoggingConfig};

/// Файловый слой с ежедневной ротацией и неблокирующей записью.
///
/// Записи сбрасываются на диск, пока жив возвращённый `WorkerGuard`.
pub fn layer_with_config<S>(config: &LoggingConfig) -> (Box<dyn LayerTrait<S> + Send + Sync>, WorkerGuard)
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let appender = daily(&config.log_dir, &config.file.filename);
    let (writer, guard) = non_blocking(appender);
    let layer = formatter::build_formatter(config.file.format, &config.console, writer, false);
    (layer, guard)
}
