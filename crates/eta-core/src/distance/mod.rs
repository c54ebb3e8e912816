//! Distance providers
//!
//! Each provider answers the same question, "how far is it from A to B in
//! kilometers", with a different strategy: a road-network lookup against an
//! external routing service or the straight-line haversine formula.

pub mod azure;
pub mod osrm;

pub use azure::AzureMapsProvider;
pub use osrm::OsrmProvider;

use async_trait::async_trait;

use crate::error::DistanceError;
use crate::geo::{haversine_km, Coordinate};

/// A source of point-to-point distance estimates
#[async_trait]
pub trait DistanceProvider: Send + Sync {
    /// Short identifier used in logs and error messages
    fn name(&self) -> &'static str;

    /// Distance from `origin` to `destination` in kilometers
    async fn distance_km(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<f64, DistanceError>;
}

/// Straight-line distance; non-finite only for coordinates that overflow
#[derive(Debug, Clone, Copy, Default)]
pub struct HaversineProvider;

#[async_trait]
impl DistanceProvider for HaversineProvider {
    fn name(&self) -> &'static str {
        "haversine"
    }

    async fn distance_km(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<f64, DistanceError> {
        Ok(haversine_km(origin, destination))
    }
}

pub(crate) fn meters_to_km(meters: f64) -> f64 {
    meters / 1000.0
}
