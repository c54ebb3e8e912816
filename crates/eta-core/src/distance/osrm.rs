//! OSRM route service
//!
//! Works against the public demo server or a local `osrm-routed` instance;
//! only the base URL differs.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::{meters_to_km, DistanceProvider};
use crate::config::OsrmConfig;
use crate::error::DistanceError;
use crate::geo::Coordinate;
use crate::http::{url_with_params, HttpClient, HttpError};

#[derive(Debug, Deserialize)]
pub(crate) struct RouteResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    distance: f64,
}

/// Road distance from an OSRM `route` service
#[derive(Debug, Clone)]
pub struct OsrmProvider {
    client: HttpClient,
    base_url: String,
    profile: String,
}

impl OsrmProvider {
    pub fn new(client: HttpClient, config: &OsrmConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            profile: config.profile.clone(),
        }
    }

    /// `GET /route/v1/{profile}/{lng1},{lat1};{lng2},{lat2}?overview=false`
    ///
    /// OSRM takes longitude first.
    pub fn route_url(&self, origin: Coordinate, destination: Coordinate) -> Result<Url, HttpError> {
        let url = format!(
            "{}/route/v1/{}/{},{};{},{}",
            self.base_url, self.profile, origin.lng, origin.lat, destination.lng, destination.lat
        );
        url_with_params(&url, &[("overview", "false")])
    }
}

pub(crate) fn first_route_km(response: RouteResponse) -> Result<f64, DistanceError> {
    if response.code != "Ok" {
        return Err(DistanceError::NoRoute(
            response.message.unwrap_or(response.code),
        ));
    }
    response
        .routes
        .first()
        .map(|route| meters_to_km(route.distance))
        .ok_or_else(|| DistanceError::NoRoute("OSRM returned no routes".to_string()))
}

#[async_trait]
impl DistanceProvider for OsrmProvider {
    fn name(&self) -> &'static str {
        "osrm"
    }

    async fn distance_km(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<f64, DistanceError> {
        let url = self.route_url(origin, destination)?;
        let response: RouteResponse = self.client.get_json_or_client_error(url).await?;
        first_route_km(response)
    }
}
