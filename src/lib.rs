pub mod accounts; // User & Role Store
pub mod api; // HTTP API
pub mod appointment; // Appointment Ledger
pub mod availability; // Availability Engine
pub mod clinical; // Clinical Records
pub mod config;
pub mod core_state; // Connection provider
pub mod crypto;
pub mod db;
pub mod feedback;
pub mod inventory;
pub mod models;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Process entry point: configure, migrate, serve until Ctrl-C.
pub async fn run() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let app_config = config::AppConfig::from_env().map_err(|e| e.to_string())?;
    let core = Arc::new(core_state::CoreState::new(app_config));
    core.initialize().map_err(|e| e.to_string())?;

    let server = api::start_api_server(core).await?;
    tracing::info!(addr = %server.session.server_addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
    }
    server.stop().await;
    Ok(())
}
