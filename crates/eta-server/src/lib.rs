//! ETA Server - travel-time query API
//!
//! HTTP front end for eta-core: validates `/query` parameters, computes
//! features and answers with the predicted ETA.

pub mod http;

use std::sync::Arc;

use axum::{routing::get, Router};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use eta_core::prediction::{self, Predictor};
use eta_core::{EtaConfig, EtaError, FeatureComputer};

/// Shared application state, built once at startup and read-only afterwards
pub struct AppState {
    pub features: FeatureComputer,
    pub predictor: Arc<dyn Predictor>,
}

impl AppState {
    pub fn new(features: FeatureComputer, predictor: Arc<dyn Predictor>) -> Self {
        Self {
            features,
            predictor,
        }
    }

    /// Create the live providers and predictor described by `config`
    pub fn from_config(config: &EtaConfig) -> Result<Self, EtaError> {
        let features = FeatureComputer::from_config(config)?;
        let predictor = prediction::from_config(&config.prediction, &config.distance.user_agent)?;

        tracing::info!(
            predictor = predictor.name(),
            failure_policy = %features.policy(),
            "Application state ready"
        );

        Ok(Self::new(features, predictor))
    }
}

/// Errors that stop the server from starting or running
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Eta(#[from] EtaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(http::index))
        .route("/query", get(http::query))
        .route("/status", get(http::get_status))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the server
pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<(), ServerError> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("ETA server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
