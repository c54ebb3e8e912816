//! Prediction capability
//!
//! The statistical model lives outside this service. A [`Predictor`] turns a
//! [`FeatureSet`] into an ETA; [`DisabledPredictor`] stands in while no model
//! is wired up and [`RemotePredictor`] calls the model runtime over HTTP.
//!
//! The model sees the features as [`ModelFeatures`], a flat record whose
//! field order is part of the contract:
//!
//! ```text
//! origin_lat, origin_lng, destination_lat, destination_lng, hour,
//! weekday, rush_hour, azure_distance, osrm_distance, crow_distance
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{PredictionConfig, PredictionMode};
use crate::error::{EtaError, PredictionError};
use crate::features::FeatureSet;
use crate::http::{HttpClient, HttpError};

/// ETA reported when no model answer is available
pub const SENTINEL_ETA: f64 = 0.0;

/// Field names of [`ModelFeatures`], in wire order
pub const FEATURE_NAMES: [&str; 10] = [
    "origin_lat",
    "origin_lng",
    "destination_lat",
    "destination_lng",
    "hour",
    "weekday",
    "rush_hour",
    "azure_distance",
    "osrm_distance",
    "crow_distance",
];

/// Feature vector as sent to the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelFeatures {
    pub origin_lat: f64,
    pub origin_lng: f64,
    pub destination_lat: f64,
    pub destination_lng: f64,
    pub hour: u8,
    /// Categorical day name, e.g. "Monday"
    pub weekday: &'static str,
    pub rush_hour: bool,
    pub azure_distance: f64,
    pub osrm_distance: f64,
    pub crow_distance: f64,
}

impl From<&FeatureSet> for ModelFeatures {
    fn from(features: &FeatureSet) -> Self {
        Self {
            origin_lat: features.origin.lat,
            origin_lng: features.origin.lng,
            destination_lat: features.destination.lat,
            destination_lng: features.destination.lng,
            hour: features.hour,
            weekday: features.weekday.label(),
            rush_hour: features.rush_hour,
            azure_distance: features.azure_distance_km,
            osrm_distance: features.osrm_distance_km,
            crow_distance: features.haversine_distance_km,
        }
    }
}

/// Response body of `/query`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub eta: f64,
}

/// Something that can turn features into an ETA
#[async_trait]
pub trait Predictor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn predict(&self, features: &FeatureSet) -> Result<f64, PredictionError>;
}

/// Always answers with [`SENTINEL_ETA`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledPredictor;

#[async_trait]
impl Predictor for DisabledPredictor {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn predict(&self, _features: &FeatureSet) -> Result<f64, PredictionError> {
        Ok(SENTINEL_ETA)
    }
}

#[derive(Debug, Deserialize)]
struct ModelResponse {
    eta: f64,
}

/// POSTs [`ModelFeatures`] as JSON and expects `{"eta": <number>}` back
#[derive(Debug, Clone)]
pub struct RemotePredictor {
    client: HttpClient,
    url: Url,
    timeout: Duration,
}

impl RemotePredictor {
    pub fn new(client: HttpClient, url: &str, timeout: Duration) -> Result<Self, HttpError> {
        let url = Url::parse(url).map_err(|_| HttpError::InvalidUrl {
            url: url.to_string(),
        })?;
        Ok(Self {
            client,
            url,
            timeout,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Predictor for RemotePredictor {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn predict(&self, features: &FeatureSet) -> Result<f64, PredictionError> {
        let body = ModelFeatures::from(features);
        let response: ModelResponse = tokio::time::timeout(
            self.timeout,
            self.client.post_json(self.url.clone(), &body),
        )
        .await
        .map_err(|_| PredictionError::Timeout)??;

        if response.eta.is_finite() && response.eta >= 0.0 {
            Ok(response.eta)
        } else {
            Err(PredictionError::InvalidEta(response.eta))
        }
    }
}

/// Build the predictor selected by `config`
pub fn from_config(
    config: &PredictionConfig,
    user_agent: &str,
) -> Result<Arc<dyn Predictor>, EtaError> {
    match config.mode {
        PredictionMode::Disabled => Ok(Arc::new(DisabledPredictor)),
        PredictionMode::Remote => {
            let url = config.url.as_deref().ok_or_else(|| {
                crate::config::ConfigError::MissingField("prediction.url".to_string())
            })?;
            let timeout = Duration::from_secs(config.timeout_secs);
            let client = HttpClient::new(user_agent, timeout)?;
            Ok(Arc::new(RemotePredictor::new(client, url, timeout)?))
        }
    }
}

/// Ask `predictor` for an ETA; any failure degrades to [`SENTINEL_ETA`]
pub async fn predict_or_sentinel(
    predictor: &dyn Predictor,
    features: &FeatureSet,
) -> PredictionResult {
    let eta = match predictor.predict(features).await {
        Ok(eta) => eta,
        Err(error) => {
            tracing::warn!(
                predictor = predictor.name(),
                %error,
                "Prediction failed, returning sentinel ETA"
            );
            SENTINEL_ETA
        }
    };
    PredictionResult { eta }
}
