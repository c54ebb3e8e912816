//! eta-core: travel-time features and prediction
//!
//! This crate holds everything the ETA service does besides speaking HTTP:
//! validating the raw query parameters, computing the distance and calendar
//! features, and handing them to a prediction model.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          eta-core                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  query         │ Query-string validation -> QueryRequest    │
//! │  geo           │ Coordinates and great-circle distance      │
//! │  distance      │ Azure Maps / OSRM / haversine providers    │
//! │  http          │ Shared reqwest client for external calls   │
//! │  features      │ Rush hours, weekdays, FeatureComputer      │
//! │  prediction    │ Predictor capability (disabled / remote)   │
//! │  config        │ EtaConfig loaded once at startup           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use eta_core::query::QueryRequest;
//!
//! let request = QueryRequest::from_params(&params)?;
//! let features = computer.compute(&request).await?;
//! let eta = eta_core::prediction::predict_or_sentinel(&predictor, &features).await;
//! ```

pub mod config;
pub mod distance;
pub mod error;
pub mod features;
pub mod geo;
pub mod http;
pub mod prediction;
pub mod query;

pub use config::EtaConfig;
pub use error::{EtaError, Result};
pub use features::{FeatureComputer, FeatureSet};
pub use geo::Coordinate;
pub use prediction::{PredictionResult, Predictor};
pub use query::QueryRequest;
