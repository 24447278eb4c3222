// src/main.rs
use split_it_now::api;
use split_it_now::config::{AppConfig, LogConfig};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let env_result = dotenvy::dotenv();

    let log_config = LogConfig::from_env();
    let filter = EnvFilter::try_new(log_config.filter()).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(err) = env_result {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            warn!("Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();

    info!("Allocation service starting...");
    if let Err(err) = api::start_api_server(app_config.api, app_config.allocator).await {
        error!("API server terminated with an error: {err}");
        std::process::exit(1);
    }
}
