//! ETA Server Binary
//!
//! Reads the configuration named by `ETA_CONFIG` (defaults otherwise),
//! applies environment overrides and serves the query API.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use eta_core::EtaConfig;
use eta_server::{serve, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = match std::env::var("ETA_CONFIG") {
        Ok(path) => {
            tracing::info!("Loading configuration from {}", path);
            EtaConfig::load(path)?
        }
        Err(_) => EtaConfig::default(),
    };
    config.apply_env();
    config.validate()?;

    if config.distance.azure.subscription_key.is_empty() {
        tracing::warn!("No Azure Maps subscription key configured, Azure lookups will fail");
    }

    let state = Arc::new(AppState::from_config(&config)?);
    serve(&config.server.addr, state).await?;
    Ok(())
}
