use anyhow::Result;
use lead_analyzer::core::ConfigManager;
use lead_analyzer::logging::{init_tracing, DEFAULT_LOG_DIRECTIVES};
use lead_analyzer::start_web_server;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(DEFAULT_LOG_DIRECTIVES);

    let config = ConfigManager::load()?;
    config.ensure_directories().await?;

    info!("Environment: {}", config.environment.name);
    info!("Database: {}", config.environment.database_path.display());
    info!(
        "Server: http://{}:{}",
        config.environment.address, config.environment.port
    );
    info!("Analysis API: {}", config.service.analysis_api_url);

    start_web_server(config).await
}
