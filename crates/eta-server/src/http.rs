//! HTTP endpoint handlers

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    Json,
};
use serde::Serialize;

use eta_core::error::{FeatureError, QueryError};
use eta_core::prediction::{predict_or_sentinel, PredictionResult};
use eta_core::QueryRequest;

use crate::AppState;

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Landing page with the query form
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// `GET /query` - predict the travel time between two points
///
/// Validation failures answer with plain text: 400 for a missing parameter,
/// 422 for malformed or out-of-range values.
pub async fn query(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<PredictionResult>, (StatusCode, String)> {
    let params = first_values(pairs);
    let request = QueryRequest::from_params(&params).map_err(query_rejection)?;

    let features = state
        .features
        .compute(&request)
        .await
        .map_err(feature_rejection)?;

    let result = predict_or_sentinel(state.predictor.as_ref(), &features).await;
    tracing::info!(
        hour = request.hour,
        weekday = %features.weekday,
        degraded = features.is_degraded(),
        eta = result.eta,
        "Answered ETA query"
    );

    Ok(Json(result))
}

/// Collapse repeated keys, keeping the first value of each
fn first_values(pairs: Vec<(String, String)>) -> HashMap<String, String> {
    let mut params = HashMap::with_capacity(pairs.len());
    for (key, value) in pairs {
        params.entry(key).or_insert(value);
    }
    params
}

fn query_rejection(err: QueryError) -> (StatusCode, String) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::UNPROCESSABLE_ENTITY);
    tracing::debug!(%err, "Rejected query");
    (status, err.to_string())
}

fn feature_rejection(err: FeatureError) -> (StatusCode, String) {
    match err {
        FeatureError::Provider { .. } => {
            tracing::error!(%err, "Distance lookup failed");
            (StatusCode::BAD_GATEWAY, err.to_string())
        }
        FeatureError::StraightLine { .. } | FeatureError::InvalidWeekday(_) => {
            tracing::debug!(%err, "Rejected query");
            (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
    }
}

/// Response for the status endpoint
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub predictor: &'static str,
    pub distance_providers: Vec<&'static str>,
    pub failure_policy: String,
}

/// Get service status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        predictor: state.predictor.name(),
        distance_providers: state.features.provider_names().to_vec(),
        failure_policy: state.features.policy().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_router;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use axum::Router;
    use rstest::rstest;
    use tower::ServiceExt;

    use eta_core::distance::DistanceProvider;
    use eta_core::error::{DistanceError, PredictionError};
    use eta_core::features::{FailurePolicy, FeatureComputer, FeatureSet};
    use eta_core::prediction::{DisabledPredictor, Predictor};
    use eta_core::Coordinate;

    struct FixedDistance(&'static str, Option<f64>);

    #[async_trait]
    impl DistanceProvider for FixedDistance {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn distance_km(&self, _: Coordinate, _: Coordinate) -> Result<f64, DistanceError> {
            self.1.ok_or(DistanceError::Status { status: 503 })
        }
    }

    /// Echoes the OSRM distance back as the ETA
    struct EchoPredictor;

    #[async_trait]
    impl Predictor for EchoPredictor {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn predict(&self, features: &FeatureSet) -> Result<f64, PredictionError> {
            Ok(features.osrm_distance_km)
        }
    }

    fn app_with(
        azure: Option<f64>,
        osrm: Option<f64>,
        policy: FailurePolicy,
        predictor: Arc<dyn Predictor>,
    ) -> Router {
        let features = FeatureComputer::new(
            Arc::new(FixedDistance("azure", azure)),
            Arc::new(FixedDistance("osrm", osrm)),
        )
        .with_policy(policy);
        create_router(Arc::new(AppState::new(features, predictor)))
    }

    fn app() -> Router {
        app_with(Some(112.0), Some(115.0), FailurePolicy::Fallback, Arc::new(DisabledPredictor))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    const VALID: &str = "/query?originLat=0&originLong=0&destinationLat=0&destinationLong=1&hour=8&weekday=1";

    #[tokio::test]
    async fn test_query_returns_eta() {
        let (status, body) = get(app(), VALID).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["eta"], 0.0);
    }

    #[tokio::test]
    async fn test_query_content_type_is_json() {
        let response = app()
            .oneshot(Request::builder().uri(VALID).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_missing_weekday() {
        let (status, body) = get(
            app(),
            "/query?originLat=0&originLong=0&destinationLat=0&destinationLong=1&hour=8",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Missing inputs: weekday not found.");
    }

    #[rstest]
    #[case("originLat")]
    #[case("originLong")]
    #[case("destinationLat")]
    #[case("destinationLong")]
    #[case("hour")]
    #[case("weekday")]
    #[tokio::test]
    async fn test_each_missing_parameter(#[case] name: &str) {
        let uri = VALID.replace(&format!("{}=", name), "unrelated=");
        let (status, body) = get(app(), &uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains(name), "{}", body);
    }

    #[tokio::test]
    async fn test_no_parameters() {
        let (status, body) = get(app(), "/query").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Missing inputs: originLat not found.");
    }

    #[rstest]
    #[case("hour=8", "hour=eight")]
    #[case("weekday=1", "weekday=1.5")]
    #[tokio::test]
    async fn test_non_integer(#[case] from: &str, #[case] to: &str) {
        let (status, body) = get(app(), &VALID.replace(from, to)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body,
            "Invalid hour or weekday - should be numbers between 0-23 and 0-6."
        );
    }

    #[rstest]
    #[case("hour=8", "hour=24", "Invalid hour: 24")]
    #[case("hour=8", "hour=-1", "Invalid hour: -1")]
    #[case("weekday=1", "weekday=7", "Invalid weekday: 7")]
    #[case("weekday=1", "weekday=-1", "Invalid weekday: -1")]
    #[tokio::test]
    async fn test_out_of_range(#[case] from: &str, #[case] to: &str, #[case] expected: &str) {
        let (status, body) = get(app(), &VALID.replace(from, to)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body, expected);
    }

    #[tokio::test]
    async fn test_invalid_coordinate() {
        let (status, body) = get(app(), &VALID.replace("originLat=0", "originLat=abc")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body, "Invalid coordinate: originLat=abc");
    }

    #[tokio::test]
    async fn test_repeated_parameter_keeps_first_value() {
        let (status, _) = get(app(), &format!("{}&hour=99", VALID)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = get(app(), &VALID.replace("hour=8", "hour=99&hour=8")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body, "Invalid hour: 99");
    }

    #[tokio::test]
    async fn test_overflowing_coordinates_are_rejected() {
        let uri = VALID
            .replace("originLat=0", "originLat=1e308")
            .replace("destinationLat=0", "destinationLat=-1e308");
        let (status, body) = get(app(), &uri).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.starts_with("Invalid coordinates"), "{}", body);
    }

    #[tokio::test]
    async fn test_near_antipodal_query_sends_finite_distances() {
        let app = app_with(None, None, FailurePolicy::Fallback, Arc::new(EchoPredictor));
        let (status, body) = get(
            app,
            "/query?originLat=-86.22&originLong=0&destinationLat=86.22&destinationLong=180&hour=8&weekday=1",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        let eta = json["eta"].as_f64().unwrap();
        assert!((eta - 20015.09).abs() < 0.01, "{}", eta);
    }

    #[tokio::test]
    async fn test_predictor_sees_features() {
        let app = app_with(Some(112.0), Some(115.0), FailurePolicy::Fallback, Arc::new(EchoPredictor));
        let (status, body) = get(app, VALID).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["eta"], 115.0);
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back() {
        let app = app_with(Some(112.0), None, FailurePolicy::Fallback, Arc::new(EchoPredictor));
        let (status, body) = get(app, VALID).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        let eta = json["eta"].as_f64().unwrap();
        // haversine for one degree of longitude at the equator
        assert!((eta - 111.195).abs() < 0.001, "{}", eta);
    }

    #[tokio::test]
    async fn test_provider_failure_with_fail_policy() {
        let app = app_with(None, Some(115.0), FailurePolicy::Fail, Arc::new(DisabledPredictor));
        let (status, body) = get(app, VALID).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.starts_with("Distance lookup failed: azure"), "{}", body);
    }

    #[tokio::test]
    async fn test_index_page() {
        let (status, body) = get(app(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("action=\"/query\""));
    }

    #[tokio::test]
    async fn test_status() {
        let (status, body) = get(app(), "/status").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["predictor"], "disabled");
        assert_eq!(json["distance_providers"], serde_json::json!(["azure", "osrm", "haversine"]));
        assert_eq!(json["failure_policy"], "fallback");
    }
}
