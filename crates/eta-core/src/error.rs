//! Error types for eta-core

use thiserror::Error;

use crate::config::ConfigError;
use crate::geo::Coordinate;
use crate::http::HttpError;

/// Result type alias for eta operations
pub type Result<T> = std::result::Result<T, EtaError>;

/// Main error type for eta operations
#[derive(Error, Debug)]
pub enum EtaError {
    /// Query validation errors
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Distance lookup errors
    #[error("Distance error: {0}")]
    Distance(#[from] DistanceError),

    /// Feature assembly errors
    #[error("Feature error: {0}")]
    Feature(#[from] FeatureError),

    /// Prediction errors
    #[error("Prediction error: {0}")]
    Prediction(#[from] PredictionError),

    /// HTTP client setup errors
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Client errors raised while validating `/query` parameters.
///
/// The `Display` text is the exact body returned to the client.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// A required parameter is absent or empty
    #[error("Missing inputs: {0} not found.")]
    MissingParameter(&'static str),

    /// Hour or weekday is not an integer
    #[error("Invalid hour or weekday - should be numbers between 0-23 and 0-6.")]
    InvalidFormat,

    /// Hour outside 0-23
    #[error("Invalid hour: {0}")]
    InvalidHour(i64),

    /// Weekday outside 0-6
    #[error("Invalid weekday: {0}")]
    InvalidWeekday(i64),

    /// Coordinate is not a finite number
    #[error("Invalid coordinate: {name}={value}")]
    InvalidCoordinate { name: &'static str, value: String },
}

impl QueryError {
    /// HTTP status this error is reported with
    pub fn status_code(&self) -> u16 {
        match self {
            QueryError::MissingParameter(_) => 400,
            QueryError::InvalidFormat
            | QueryError::InvalidHour(_)
            | QueryError::InvalidWeekday(_)
            | QueryError::InvalidCoordinate { .. } => 422,
        }
    }

    /// Whether the value was numeric but outside its domain
    pub fn is_range_error(&self) -> bool {
        matches!(self, QueryError::InvalidHour(_) | QueryError::InvalidWeekday(_))
    }
}

/// Errors from a road-distance provider
#[derive(Error, Debug)]
pub enum DistanceError {
    #[error("Request failed: {message}")]
    Http { message: String },

    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },

    #[error("Unexpected status: {status}")]
    Status { status: u16 },

    #[error("Rate limited")]
    RateLimited,

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {message}")]
    Parse { message: String },

    /// The service answered but found no route between the points
    #[error("No route: {0}")]
    NoRoute(String),
}

impl From<HttpError> for DistanceError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::RequestFailed { message } => DistanceError::Http { message },
            HttpError::InvalidUrl { url } => DistanceError::InvalidUrl { url },
            HttpError::Status { status } => DistanceError::Status { status },
            HttpError::RateLimited => DistanceError::RateLimited,
            HttpError::Timeout => DistanceError::Timeout,
            HttpError::ParseError { message } => DistanceError::Parse { message },
        }
    }
}

/// Errors while assembling a feature set
#[derive(Error, Debug)]
pub enum FeatureError {
    /// A road-distance provider failed and the failure policy forbids fallback
    #[error("Distance lookup failed: {provider}: {source}")]
    Provider {
        provider: &'static str,
        #[source]
        source: DistanceError,
    },

    /// No usable straight-line distance, e.g. coordinates so large the
    /// arithmetic overflows
    #[error("Invalid coordinates: no distance between {origin} and {destination}: {source}")]
    StraightLine {
        origin: Coordinate,
        destination: Coordinate,
        #[source]
        source: DistanceError,
    },

    /// Weekday index outside 0-6
    #[error("Invalid weekday index: {0}")]
    InvalidWeekday(u8),
}

/// Errors from a prediction model
#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Model request failed: {message}")]
    Request { message: String },

    #[error("Model returned status {status}")]
    Status { status: u16 },

    #[error("Model response could not be parsed: {message}")]
    Parse { message: String },

    #[error("Model timed out")]
    Timeout,

    /// The model produced a value that is not a usable ETA
    #[error("Model returned an invalid ETA: {0}")]
    InvalidEta(f64),
}

impl From<HttpError> for PredictionError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Timeout => PredictionError::Timeout,
            HttpError::Status { status } => PredictionError::Status { status },
            HttpError::ParseError { message } => PredictionError::Parse { message },
            other => PredictionError::Request {
                message: other.to_string(),
            },
        }
    }
}
