//! Azure Maps route directions

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::{meters_to_km, DistanceProvider};
use crate::config::AzureConfig;
use crate::error::DistanceError;
use crate::geo::Coordinate;
use crate::http::{url_with_params, HttpClient, HttpError};

const API_VERSION: &str = "1.0";

#[derive(Debug, Deserialize)]
pub(crate) struct RouteDirectionsResponse {
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    summary: Summary,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    length_in_meters: f64,
}

/// Road distance from the Azure Maps route directions API
#[derive(Debug, Clone)]
pub struct AzureMapsProvider {
    client: HttpClient,
    base_url: String,
    subscription_key: String,
}

impl AzureMapsProvider {
    pub fn new(client: HttpClient, config: &AzureConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            subscription_key: config.subscription_key.clone(),
        }
    }

    /// `GET /route/directions/json?query=lat1,lng1:lat2,lng2`
    pub fn route_url(&self, origin: Coordinate, destination: Coordinate) -> Result<Url, HttpError> {
        let query = format!("{}:{}", origin, destination);
        url_with_params(
            &format!("{}/route/directions/json", self.base_url),
            &[
                ("api-version", API_VERSION),
                ("subscription-key", self.subscription_key.as_str()),
                ("query", query.as_str()),
            ],
        )
    }
}

pub(crate) fn first_route_km(response: RouteDirectionsResponse) -> Result<f64, DistanceError> {
    response
        .routes
        .first()
        .map(|route| meters_to_km(route.summary.length_in_meters))
        .ok_or_else(|| DistanceError::NoRoute("Azure Maps returned no routes".to_string()))
}

#[async_trait]
impl DistanceProvider for AzureMapsProvider {
    fn name(&self) -> &'static str {
        "azure"
    }

    async fn distance_km(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<f64, DistanceError> {
        let url = self.route_url(origin, destination)?;
        let response: RouteDirectionsResponse = self.client.get_json(url).await?;
        first_route_km(response)
    }
}
