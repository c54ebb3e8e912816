//! Configuration for the ETA service
//!
//! Loaded once at startup (file, then environment overrides) and read-only
//! for the rest of the process lifetime.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::features::{FailurePolicy, HourRange, RushHourTable};
use crate::query::MAX_HOUR;

pub const ENV_ADDR: &str = "ETA_ADDR";
pub const ENV_AZURE_KEY: &str = "AZURE_MAPS_KEY";
pub const ENV_OSRM_URL: &str = "OSRM_URL";
pub const ENV_MODEL_URL: &str = "ETA_MODEL_URL";

/// Service-wide configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EtaConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// External road-distance services
    pub distance: DistanceConfig,
    /// Prediction model settings
    pub prediction: PredictionConfig,
    /// Hour ranges flagged as rush hour; absent means the built-in table,
    /// an empty list means no rush hours at all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rush_hours: Option<Vec<HourRange>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceConfig {
    /// Upper bound for each road-distance lookup
    pub timeout_secs: u64,
    /// What to do when a lookup fails
    pub failure_policy: FailurePolicy,
    pub user_agent: String,
    pub azure: AzureConfig,
    pub osrm: OsrmConfig,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            failure_policy: FailurePolicy::default(),
            user_agent: concat!("eta-service/", env!("CARGO_PKG_VERSION")).to_string(),
            azure: AzureConfig::default(),
            osrm: OsrmConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureConfig {
    pub base_url: String,
    pub subscription_key: String,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            base_url: "https://atlas.microsoft.com".to_string(),
            subscription_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OsrmConfig {
    /// Public demo server by default; point at a local instance for stability
    pub base_url: String,
    pub profile: String,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://router.project-osrm.org".to_string(),
            profile: "driving".to_string(),
        }
    }
}

/// Which predictor the service runs with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionMode {
    /// No model wired in; every ETA is the sentinel
    #[default]
    Disabled,
    /// Call the model runtime over HTTP
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    pub mode: PredictionMode,
    /// Model runtime endpoint, required for `remote`
    pub url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            mode: PredictionMode::Disabled,
            url: None,
            timeout_secs: 10,
        }
    }
}

impl EtaConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load a `.json` or `.toml` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_toml(&content),
        }
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`, ignoring empty values
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(addr) = lookup(ENV_ADDR) {
            self.server.addr = addr;
        }
        if let Some(key) = lookup(ENV_AZURE_KEY) {
            self.distance.azure.subscription_key = key;
        }
        if let Some(url) = lookup(ENV_OSRM_URL) {
            self.distance.osrm.base_url = url;
        }
        if let Some(url) = lookup(ENV_MODEL_URL) {
            self.prediction.url = Some(url);
            self.prediction.mode = PredictionMode::Remote;
        }
    }

    /// Rush-hour table, falling back to the built-in one when none is configured
    pub fn rush_hour_table(&self) -> RushHourTable {
        match &self.rush_hours {
            Some(ranges) => RushHourTable::new(ranges.clone()),
            None => RushHourTable::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.addr.trim().is_empty() {
            return Err(ConfigError::MissingField("server.addr".to_string()));
        }

        for range in self.rush_hours.iter().flatten() {
            if range.start > range.end || i64::from(range.end) > MAX_HOUR {
                return Err(ConfigError::InvalidRushHours(format!(
                    "{}-{} must satisfy start <= end <= {}",
                    range.start, range.end, MAX_HOUR
                )));
            }
        }

        if self.distance.timeout_secs == 0 {
            return Err(ConfigError::OutOfRange(
                "distance.timeout_secs must be positive".to_string(),
            ));
        }
        if self.prediction.timeout_secs == 0 {
            return Err(ConfigError::OutOfRange(
                "prediction.timeout_secs must be positive".to_string(),
            ));
        }

        check_url("distance.azure.base_url", &self.distance.azure.base_url)?;
        check_url("distance.osrm.base_url", &self.distance.osrm.base_url)?;

        if self.prediction.mode == PredictionMode::Remote {
            let url = self
                .prediction
                .url
                .as_deref()
                .ok_or_else(|| ConfigError::MissingField("prediction.url".to_string()))?;
            check_url("prediction.url", url)?;
        }

        Ok(())
    }
}

fn check_url(field: &str, value: &str) -> Result<(), ConfigError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidUrl(format!("{}: {} ({})", field, value, e)))
}

/// Configuration loading or validation error
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Rush-hour ranges are malformed
    #[error("Invalid rush hours: {0}")]
    InvalidRushHours(String),
    /// Value is out of valid range
    #[error("Value out of range: {0}")]
    OutOfRange(String),
    /// Required field is missing
    #[error("Missing field: {0}")]
    MissingField(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
}
