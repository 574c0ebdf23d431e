//! Route handlers and error mapping

use super::AppState;
use crate::geo::{BoundingBox, Feature, Geometry};
use crate::interpolate::interpolate;
use crate::location::{ErrorPayload, LocationQuery};
use crate::metrics;
use crate::search::{SearchOutcome, EMPTY_COVERAGE_MESSAGE};
use crate::AirScopeError;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Error body for every non-2xx response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Body for a search that found no sensors
#[derive(Debug, Serialize)]
struct EmptyCoverageResponse {
    bbox: BoundingBox,
    polygon: Geometry,
    message: &'static str,
}

#[derive(Debug, Serialize)]
pub(super) struct AverageResponse {
    location: String,
    #[serde(rename = "pm2.5_60minute_mean")]
    pm2_5_60minute_mean: f64,
    sensor_count: usize,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(super) enum Projection {
    #[default]
    Wgs84,
    Utm,
}

#[derive(Debug, Deserialize)]
pub(super) struct SensorsParams {
    #[serde(default)]
    projection: Projection,
}

#[derive(Debug, Serialize)]
struct SensorPointsResponse {
    #[serde(rename = "type")]
    kind: &'static str,
    crs: String,
    expanded: bool,
    features: Vec<Feature>,
}

fn status_for(err: &AirScopeError) -> StatusCode {
    match err {
        AirScopeError::InvalidLocation(_) => StatusCode::BAD_REQUEST,
        AirScopeError::EmptyTable => StatusCode::NOT_FOUND,
        e if e.is_upstream() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(err: AirScopeError) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, kind = err.kind(), "Request failed");
    } else {
        tracing::debug!(error = %err, "Request rejected");
    }
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

fn invalid_location(payload: ErrorPayload) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: payload.message,
        }),
    )
}

fn parse_location(location: &str) -> Result<LocationQuery, ApiError> {
    LocationQuery::parse(location).map_err(api_error)
}

fn empty_coverage(bbox: BoundingBox, polygon: Geometry) -> Response {
    Json(EmptyCoverageResponse {
        bbox,
        polygon,
        message: EMPTY_COVERAGE_MESSAGE,
    })
    .into_response()
}

pub(super) async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

pub(super) async fn get_points(
    State(state): State<Arc<AppState>>,
    Path(location): Path<String>,
) -> Result<Response, ApiError> {
    let query = parse_location(&location)?;

    match state.search.search(&query).await.map_err(api_error)? {
        SearchOutcome::Found { table, expanded } => {
            let map = interpolate(&table, expanded, state.policy).map_err(api_error)?;
            Ok(Json(map).into_response())
        }
        SearchOutcome::Empty { bbox, polygon } => Ok(empty_coverage(bbox, polygon)),
        SearchOutcome::Invalid(payload) => Err(invalid_location(payload)),
    }
}

pub(super) async fn get_average(
    State(state): State<Arc<AppState>>,
    Path(location): Path<String>,
) -> Result<Json<AverageResponse>, ApiError> {
    let query = parse_location(&location)?;

    let table = state
        .search
        .search_unexpanded(&query)
        .await
        .map_err(api_error)?
        .ok_or_else(|| invalid_location(ErrorPayload::invalid_location()))?;

    let mean = table
        .mean_pm2_5_60minute()
        .ok_or_else(|| api_error(AirScopeError::EmptyTable))?;

    Ok(Json(AverageResponse {
        location: query.to_string(),
        pm2_5_60minute_mean: mean,
        sensor_count: table.len(),
    }))
}

pub(super) async fn get_sensors(
    State(state): State<Arc<AppState>>,
    Path(location): Path<String>,
    Query(params): Query<SensorsParams>,
) -> Result<Response, ApiError> {
    let query = parse_location(&location)?;

    let (table, expanded) = match state.search.search(&query).await.map_err(api_error)? {
        SearchOutcome::Found { table, expanded } => (table, expanded),
        SearchOutcome::Empty { bbox, polygon } => return Ok(empty_coverage(bbox, polygon)),
        SearchOutcome::Invalid(payload) => return Err(invalid_location(payload)),
    };

    let (crs, collection) = match params.projection {
        Projection::Wgs84 => (
            "EPSG:4326".to_string(),
            table.to_feature_collection().map_err(api_error)?,
        ),
        Projection::Utm => {
            let (zone, collection) = table
                .to_utm_feature_collection()
                .map_err(api_error)?
                .ok_or_else(|| api_error(AirScopeError::EmptyTable))?;
            (format!("EPSG:{}", zone.epsg()), collection)
        }
    };

    Ok(Json(SensorPointsResponse {
        kind: "FeatureCollection",
        crs,
        expanded,
        features: collection.features,
    })
    .into_response())
}

pub(super) async fn get_metrics() -> Result<Response, ApiError> {
    let body = metrics::encode_metrics().map_err(api_error)?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::super::MapServer;
    use super::*;
    use crate::config::AirScopeConfig;
    use crate::location::{GeocodeOutcome, Geocoder};
    use crate::sensors::{RawSensorPayload, SensorSource};
    use crate::Result;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    /// Places everything except "Atlantis" around midtown Manhattan
    struct FakeGeocoder;

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        async fn geocode(&self, query: &LocationQuery) -> Result<GeocodeOutcome> {
            if query.as_str() == "Atlantis" {
                return Ok(GeocodeOutcome::NotFound);
            }
            Ok(GeocodeOutcome::Found(
                ["40.74", "40.76", "-74.00", "-73.98"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            ))
        }
    }

    enum FakeSensors {
        Rows(Vec<Value>),
        Down,
    }

    #[async_trait]
    impl SensorSource for FakeSensors {
        async fn sensors_in(&self, _bbox: &BoundingBox) -> Result<RawSensorPayload> {
            match self {
                FakeSensors::Rows(rows) => Ok(RawSensorPayload {
                    fields: Vec::new(),
                    data: rows
                        .iter()
                        .map(|r| r.as_array().cloned().unwrap_or_default())
                        .collect(),
                }),
                FakeSensors::Down => Err(AirScopeError::UpstreamUnavailable(
                    "sensor network returned HTTP 503".to_string(),
                )),
            }
        }
    }

    fn two_rows() -> Vec<Value> {
        vec![
            json!([131, "Chelsea", 40.73, -73.99, 52, 8.1, 12.0, 14.2, 11.0, 10.5, 9.75]),
            json!([207, "LIC", 40.75, -73.95, null, 15.0, 20.0, 22.0, 19.0, null, 18.25]),
        ]
    }

    fn app(sensors: FakeSensors) -> axum::Router {
        let state = AppState::with_sources(
            Arc::new(FakeGeocoder),
            Arc::new(sensors),
            &AirScopeConfig::default(),
        );
        MapServer::router(Arc::new(state))
    }

    async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (status, body) = get(app(FakeSensors::Rows(vec![])), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_points_returns_map() {
        let (status, body) = get(app(FakeSensors::Rows(two_rows())), "/points/10001").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["expanded"], json!(false));
        assert_eq!(body["policy"], json!("knn"));
        assert_eq!(body["grid"]["features"].as_array().unwrap().len(), 10_000);
        assert_eq!(body["sensors"]["features"].as_array().unwrap().len(), 2);
        assert_eq!(body["bounds"], json!([[40.73, -73.99], [40.75, -73.95]]));
    }

    #[tokio::test]
    async fn test_points_empty_coverage() {
        let (status, body) = get(app(FakeSensors::Rows(vec![])), "/points/10001").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], json!(EMPTY_COVERAGE_MESSAGE));
        assert_eq!(body["polygon"]["type"], json!("Polygon"));
        assert_eq!(body["polygon"]["coordinates"][0].as_array().unwrap().len(), 5);
        // Factor 3 pad (0.4) plus the postal pad (0.1)
        let min_lat = body["bbox"]["min_lat"].as_f64().unwrap();
        assert!((min_lat - 40.24).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_points_invalid_location() {
        let (status, body) = get(app(FakeSensors::Rows(two_rows())), "/points/Atlantis").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("verify location is in the United States"));

        let (status, _) = get(app(FakeSensors::Rows(two_rows())), "/points/%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_bad_gateway() {
        let (status, body) = get(app(FakeSensors::Down), "/points/10001").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_malformed_rows_are_bad_gateway() {
        let rows = vec![json!([131, "Chelsea", 40.73])];
        let (status, _) = get(app(FakeSensors::Rows(rows)), "/points/10001").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_average() {
        let (status, body) = get(app(FakeSensors::Rows(two_rows())), "/average/10001").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["location"], json!("10001"));
        assert_eq!(body["pm2.5_60minute_mean"], json!(14.0));
        assert_eq!(body["sensor_count"], json!(2));
    }

    #[tokio::test]
    async fn test_average_without_sensors_is_not_found() {
        let (status, body) = get(app(FakeSensors::Rows(vec![])), "/average/10001").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());

        let (status, _) = get(app(FakeSensors::Rows(vec![])), "/average/Atlantis").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sensors_projection() {
        let (status, body) = get(app(FakeSensors::Rows(two_rows())), "/sensors/10001").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["crs"], json!("EPSG:4326"));
        assert_eq!(body["type"], json!("FeatureCollection"));
        assert_eq!(
            body["features"][0]["geometry"]["coordinates"],
            json!([-73.99, 40.73])
        );

        let (status, body) = get(
            app(FakeSensors::Rows(two_rows())),
            "/sensors/10001?projection=utm",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["crs"], json!("EPSG:32618"));
        let easting = body["features"][0]["geometry"]["coordinates"][0]
            .as_f64()
            .unwrap();
        assert!(easting > 500_000.0 && easting < 700_000.0);
        assert_eq!(body["features"][0]["properties"]["name"], json!("Chelsea"));
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = app(FakeSensors::Rows(two_rows()));
        get(app.clone(), "/points/10001").await;

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("airscope_search_outcomes_total"));
    }
}
