use psmon_relay::{init_logging, ClientInfo, LoggingConfig, Settings, Subscriber};

/// Запрашивает у сервера, заданного переменными `PSMON_*`, список тем.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logging = init_logging(LoggingConfig::default()).map_err(|e| anyhow::anyhow!("{e}"))?;

    let settings = Settings::load()?;
    let info = ClientInfo::from_settings(&settings, "");
    tracing::debug!(
        server = %settings.server,
        port = settings.port,
        "Attempting to retrieve topic list from server"
    );

    let result = Subscriber::<Vec<String>>::fetch_topic_list(&info, settings.timeout()).await;
    match &result {
        Ok(topics) => tracing::info!(server = %settings.server, ?topics, "Available topics"),
        Err(e) => tracing::error!(
            server = %settings.server,
            port = settings.port,
            error = %e,
            "Failed to retrieve topic information - server may be down!"
        ),
    }

    logging.shutdown();
    result.map(|_| ()).map_err(Into::into)
}
