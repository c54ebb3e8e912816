//! Feature computation
//!
//! A [`FeatureSet`] combines three distance estimates (Azure Maps, OSRM,
//! haversine) with two calendar features (rush hour and weekday). The road
//! distances come from external services and may fail; what happens then is
//! governed by [`FailurePolicy`].

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::EtaConfig;
use crate::distance::{AzureMapsProvider, DistanceProvider, HaversineProvider, OsrmProvider};
use crate::error::{DistanceError, EtaError, FeatureError};
use crate::geo::Coordinate;
use crate::http::HttpClient;
use crate::query::QueryRequest;

// ============================================================================
// Calendar features
// ============================================================================

/// Inclusive range of hours, e.g. 7-9 covers 07:00 to 09:59
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourRange {
    pub start: u8,
    pub end: u8,
}

impl HourRange {
    pub fn new(start: u8, end: u8) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, hour: u8) -> bool {
        (self.start..=self.end).contains(&hour)
    }
}

/// Hour ranges that count as rush hour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RushHourTable {
    ranges: Vec<HourRange>,
}

impl RushHourTable {
    pub fn new(ranges: Vec<HourRange>) -> Self {
        Self { ranges }
    }

    pub fn ranges(&self) -> &[HourRange] {
        &self.ranges
    }

    pub fn is_rush_hour(&self, hour: u8) -> bool {
        self.ranges.iter().any(|r| r.contains(hour))
    }
}

impl Default for RushHourTable {
    /// Morning 07-09 and evening 16-18 peaks
    fn default() -> Self {
        Self::new(vec![HourRange::new(7, 9), HourRange::new(16, 18)])
    }
}

/// Day of week as a categorical model feature. Index 0 is Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }

    pub fn index(&self) -> u8 {
        *self as u8
    }

    pub fn label(&self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }

    pub fn is_weekend(&self) -> bool {
        matches!(self, Weekday::Saturday | Weekday::Sunday)
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Feature set
// ============================================================================

/// What to do when a road-distance lookup fails or times out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Substitute the haversine distance and carry on
    #[default]
    Fallback,
    /// Fail the whole request
    Fail,
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePolicy::Fallback => f.write_str("fallback"),
            FailurePolicy::Fail => f.write_str("fail"),
        }
    }
}

/// Where a road distance came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceSource {
    Measured,
    /// The provider failed; the haversine distance stands in
    Fallback,
}

/// Everything the model needs for one query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSet {
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub hour: u8,
    pub weekday: Weekday,
    pub rush_hour: bool,
    pub azure_distance_km: f64,
    pub osrm_distance_km: f64,
    pub haversine_distance_km: f64,
    pub azure_source: DistanceSource,
    pub osrm_source: DistanceSource,
}

impl FeatureSet {
    /// Whether any road distance had to be substituted
    pub fn is_degraded(&self) -> bool {
        self.azure_source == DistanceSource::Fallback || self.osrm_source == DistanceSource::Fallback
    }
}

// ============================================================================
// Feature computer
// ============================================================================

/// Builds a [`FeatureSet`] from a validated query
pub struct FeatureComputer {
    azure: Arc<dyn DistanceProvider>,
    osrm: Arc<dyn DistanceProvider>,
    straight_line: Arc<dyn DistanceProvider>,
    rush_hours: RushHourTable,
    policy: FailurePolicy,
    timeout: Duration,
}

impl FeatureComputer {
    pub fn new(azure: Arc<dyn DistanceProvider>, osrm: Arc<dyn DistanceProvider>) -> Self {
        Self {
            azure,
            osrm,
            straight_line: Arc::new(HaversineProvider),
            rush_hours: RushHourTable::default(),
            policy: FailurePolicy::default(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Wire up the Azure Maps and OSRM providers described by `config`
    pub fn from_config(config: &EtaConfig) -> Result<Self, EtaError> {
        let timeout = Duration::from_secs(config.distance.timeout_secs);
        let client = HttpClient::new(&config.distance.user_agent, timeout)?;

        let azure = AzureMapsProvider::new(client.clone(), &config.distance.azure);
        let osrm = OsrmProvider::new(client, &config.distance.osrm);

        Ok(Self::new(Arc::new(azure), Arc::new(osrm))
            .with_rush_hours(config.rush_hour_table())
            .with_policy(config.distance.failure_policy)
            .with_timeout(timeout))
    }

    /// Replace the straight-line estimate, haversine by default
    pub fn with_straight_line(mut self, provider: Arc<dyn DistanceProvider>) -> Self {
        self.straight_line = provider;
        self
    }

    pub fn with_rush_hours(mut self, rush_hours: RushHourTable) -> Self {
        self.rush_hours = rush_hours;
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn provider_names(&self) -> [&'static str; 3] {
        [self.azure.name(), self.osrm.name(), self.straight_line.name()]
    }

    /// Compute all features for `request`.
    ///
    /// All three distances are looked up concurrently, each bounded by the
    /// configured timeout. The straight-line distance is also the fallback
    /// for the road distances, so it must succeed.
    pub async fn compute(&self, request: &QueryRequest) -> Result<FeatureSet, FeatureError> {
        let weekday = Weekday::from_index(request.weekday)
            .ok_or(FeatureError::InvalidWeekday(request.weekday))?;

        let (straight_line, azure, osrm) = tokio::join!(
            self.lookup(self.straight_line.as_ref(), request),
            self.lookup(self.azure.as_ref(), request),
            self.lookup(self.osrm.as_ref(), request),
        );
        let haversine = straight_line.map_err(|source| FeatureError::StraightLine {
            origin: request.origin,
            destination: request.destination,
            source,
        })?;
        let (azure_distance_km, azure_source) = self.resolve(self.azure.name(), azure, haversine)?;
        let (osrm_distance_km, osrm_source) = self.resolve(self.osrm.name(), osrm, haversine)?;

        let features = FeatureSet {
            origin: request.origin,
            destination: request.destination,
            hour: request.hour,
            weekday,
            rush_hour: self.rush_hours.is_rush_hour(request.hour),
            azure_distance_km,
            osrm_distance_km,
            haversine_distance_km: haversine,
            azure_source,
            osrm_source,
        };
        tracing::debug!(?features, "Computed features");

        Ok(features)
    }

    async fn lookup(
        &self,
        provider: &dyn DistanceProvider,
        request: &QueryRequest,
    ) -> Result<f64, DistanceError> {
        let km = tokio::time::timeout(
            self.timeout,
            provider.distance_km(request.origin, request.destination),
        )
        .await
        .unwrap_or(Err(DistanceError::Timeout))?;

        if km.is_finite() && km >= 0.0 {
            Ok(km)
        } else {
            Err(DistanceError::Parse {
                message: format!("{} returned distance {}", provider.name(), km),
            })
        }
    }

    fn resolve(
        &self,
        provider: &'static str,
        result: Result<f64, DistanceError>,
        haversine: f64,
    ) -> Result<(f64, DistanceSource), FeatureError> {
        match (result, self.policy) {
            (Ok(km), _) => Ok((km, DistanceSource::Measured)),
            (Err(error), FailurePolicy::Fallback) => {
                tracing::warn!(provider, %error, "Distance lookup failed, using haversine distance");
                Ok((haversine, DistanceSource::Fallback))
            }
            (Err(source), FailurePolicy::Fail) => Err(FeatureError::Provider { provider, source }),
        }
    }
}
