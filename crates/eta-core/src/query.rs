//! Validation of the `/query` parameters
//!
//! Turns the raw query-string map into a [`QueryRequest`]. Checks run in a
//! fixed order so the client always hears about the first problem:
//!
//! 1. every required parameter is present and non-empty
//! 2. `hour` and `weekday` parse as integers
//! 3. `hour` lies in 0-23, then `weekday` in 0-6
//! 4. the four coordinates parse as finite numbers

use std::collections::HashMap;

use serde::Serialize;

use crate::error::QueryError;
use crate::geo::Coordinate;

pub const ORIGIN_LAT: &str = "originLat";
pub const ORIGIN_LONG: &str = "originLong";
pub const DESTINATION_LAT: &str = "destinationLat";
pub const DESTINATION_LONG: &str = "destinationLong";
pub const HOUR: &str = "hour";
pub const WEEKDAY: &str = "weekday";

/// Required parameters in the order they are checked
pub const REQUIRED_PARAMETERS: [&str; 6] = [
    ORIGIN_LAT,
    ORIGIN_LONG,
    DESTINATION_LAT,
    DESTINATION_LONG,
    HOUR,
    WEEKDAY,
];

pub const MAX_HOUR: i64 = 23;
pub const MAX_WEEKDAY: i64 = 6;

/// A validated ETA query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRequest {
    pub origin: Coordinate,
    pub destination: Coordinate,
    /// Hour of day, 0-23
    pub hour: u8,
    /// Day of week, 0-6 with 0 = Monday
    pub weekday: u8,
}

impl QueryRequest {
    /// Validate raw query parameters.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, QueryError> {
        for name in REQUIRED_PARAMETERS {
            if params.get(name).map_or(true, |v| v.is_empty()) {
                return Err(QueryError::MissingParameter(name));
            }
        }
        let raw = |name: &str| params.get(name).map(String::as_str).unwrap_or_default();

        let (hour, weekday) = match (parse_int(raw(HOUR)), parse_int(raw(WEEKDAY))) {
            (Some(hour), Some(weekday)) => (hour, weekday),
            _ => return Err(QueryError::InvalidFormat),
        };
        if !(0..=MAX_HOUR).contains(&hour) {
            return Err(QueryError::InvalidHour(hour));
        }
        if !(0..=MAX_WEEKDAY).contains(&weekday) {
            return Err(QueryError::InvalidWeekday(weekday));
        }

        let origin = Coordinate::new(
            parse_coordinate(ORIGIN_LAT, raw(ORIGIN_LAT))?,
            parse_coordinate(ORIGIN_LONG, raw(ORIGIN_LONG))?,
        );
        let destination = Coordinate::new(
            parse_coordinate(DESTINATION_LAT, raw(DESTINATION_LAT))?,
            parse_coordinate(DESTINATION_LONG, raw(DESTINATION_LONG))?,
        );

        Ok(Self {
            origin,
            destination,
            hour: hour as u8,
            weekday: weekday as u8,
        })
    }
}

fn parse_int(value: &str) -> Option<i64> {
    value.trim().parse().ok()
}

fn parse_coordinate(name: &'static str, value: &str) -> Result<f64, QueryError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| QueryError::InvalidCoordinate {
            name,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn valid_params() -> HashMap<String, String> {
        [
            (ORIGIN_LAT, "0"),
            (ORIGIN_LONG, "0"),
            (DESTINATION_LAT, "0"),
            (DESTINATION_LONG, "1"),
            (HOUR, "8"),
            (WEEKDAY, "1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn with(name: &str, value: &str) -> HashMap<String, String> {
        let mut params = valid_params();
        params.insert(name.to_string(), value.to_string());
        params
    }

    #[test]
    fn test_valid_request() {
        let request = QueryRequest::from_params(&valid_params()).unwrap();
        assert_eq!(request.origin, Coordinate::new(0.0, 0.0));
        assert_eq!(request.destination, Coordinate::new(0.0, 1.0));
        assert_eq!(request.hour, 8);
        assert_eq!(request.weekday, 1);
    }

    #[rstest]
    #[case(ORIGIN_LAT)]
    #[case(ORIGIN_LONG)]
    #[case(DESTINATION_LAT)]
    #[case(DESTINATION_LONG)]
    #[case(HOUR)]
    #[case(WEEKDAY)]
    fn test_missing_parameter_is_named(#[case] name: &'static str) {
        let mut params = valid_params();
        params.remove(name);
        let err = QueryRequest::from_params(&params).unwrap_err();
        assert_eq!(err, QueryError::MissingParameter(name));
        assert!(err.to_string().contains(name));
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let err = QueryRequest::from_params(&with(HOUR, "")).unwrap_err();
        assert_eq!(err, QueryError::MissingParameter(HOUR));
    }

    #[test]
    fn test_first_missing_parameter_wins() {
        let mut params = valid_params();
        params.remove(WEEKDAY);
        params.remove(ORIGIN_LONG);
        let err = QueryRequest::from_params(&params).unwrap_err();
        assert_eq!(err, QueryError::MissingParameter(ORIGIN_LONG));
    }

    #[rstest]
    #[case(HOUR, "eight")]
    #[case(HOUR, "8.5")]
    #[case(HOUR, " ")]
    #[case(WEEKDAY, "mon")]
    #[case(WEEKDAY, "1e0")]
    fn test_non_integer_is_format_error(#[case] name: &str, #[case] value: &str) {
        let err = QueryRequest::from_params(&with(name, value)).unwrap_err();
        assert_eq!(err, QueryError::InvalidFormat);
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn test_surrounding_whitespace_is_accepted() {
        let request = QueryRequest::from_params(&with(HOUR, " 17 ")).unwrap();
        assert_eq!(request.hour, 17);
    }

    #[rstest]
    #[case(-1)]
    #[case(24)]
    #[case(100)]
    fn test_hour_out_of_range(#[case] hour: i64) {
        let err = QueryRequest::from_params(&with(HOUR, &hour.to_string())).unwrap_err();
        assert_eq!(err, QueryError::InvalidHour(hour));
        assert_eq!(err.to_string(), format!("Invalid hour: {}", hour));
    }

    #[rstest]
    #[case(-1)]
    #[case(7)]
    fn test_weekday_out_of_range(#[case] weekday: i64) {
        let err = QueryRequest::from_params(&with(WEEKDAY, &weekday.to_string())).unwrap_err();
        assert_eq!(err, QueryError::InvalidWeekday(weekday));
    }

    #[rstest]
    #[case(0, 0)]
    #[case(23, 6)]
    fn test_range_boundaries_accepted(#[case] hour: u8, #[case] weekday: u8) {
        let mut params = with(HOUR, &hour.to_string());
        params.insert(WEEKDAY.to_string(), weekday.to_string());
        let request = QueryRequest::from_params(&params).unwrap();
        assert_eq!((request.hour, request.weekday), (hour, weekday));
    }

    #[test]
    fn test_hour_checked_before_weekday() {
        let mut params = with(HOUR, "24");
        params.insert(WEEKDAY.to_string(), "9".to_string());
        let err = QueryRequest::from_params(&params).unwrap_err();
        assert_eq!(err, QueryError::InvalidHour(24));
    }

    #[rstest]
    #[case(ORIGIN_LAT, "north")]
    #[case(DESTINATION_LONG, "NaN")]
    #[case(ORIGIN_LONG, "inf")]
    fn test_invalid_coordinate(#[case] name: &'static str, #[case] value: &str) {
        let err = QueryRequest::from_params(&with(name, value)).unwrap_err();
        assert_eq!(
            err,
            QueryError::InvalidCoordinate {
                name,
                value: value.to_string()
            }
        );
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn test_coordinates_are_not_range_checked() {
        let request = QueryRequest::from_params(&with(ORIGIN_LAT, "123.4")).unwrap();
        assert_eq!(request.origin.lat, 123.4);
    }
}
