use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use intake_api::config::{load_config, AppConfig};
use intake_api::http::HttpServer;
use intake_api::observability::logging::{Level, Logging, StdoutSink};
use intake_api::observability::shipper::LogShipper;

#[derive(Parser, Debug)]
#[command(name = "intake-api", about = "Document intake HTTP API")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "intake_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("intake-api v0.1.0 starting");

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        log_level = %config.logging.level,
        "Configuration loaded"
    );

    let logging = build_logging(&config)?;

    let listener = tokio::net::TcpListener::bind(&config.listener.bind_address).await?;
    HttpServer::new(config, logging).run(listener).await?;
    Ok(())
}

fn build_logging(config: &AppConfig) -> Result<Logging, reqwest::Error> {
    let level = config
        .logging
        .level
        .parse::<Level>()
        .unwrap_or(Level::Info);

    let mut builder = Logging::builder().level(level).sink(Arc::new(StdoutSink));
    if config.logging.shipping.enabled {
        let shipper = LogShipper::spawn(&config.logging.shipping)?;
        builder = builder.sink(Arc::new(shipper));
    }
    Ok(builder.build())
}
