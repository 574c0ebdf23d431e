//! Integration tests for AirScope
//!
//! These tests drive the public API from config loading through search,
//! interpolation and the HTTP router, with in-process upstream fakes.

use airscope::config::{validate_config_result, AirScopeConfig, Credentials, PolicyKind};
use airscope::geo::{BoundingBox, Geometry};
use airscope::interpolate::{interpolate, InterpolationPolicy, GRID_SIZE};
use airscope::location::{GeocodeOutcome, Geocoder, LocationQuery};
use airscope::search::SearchOutcome;
use airscope::sensors::{RawSensorPayload, SensorSource, SensorTable};
use airscope::server::{AppState, MapServer};
use airscope::{AirScopeError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Geocoder that places every query on the same raw box
struct StaticGeocoder {
    calls: AtomicUsize,
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn geocode(&self, query: &LocationQuery) -> Result<GeocodeOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if query.as_str().eq_ignore_ascii_case("nowhere") {
            return Ok(GeocodeOutcome::NotFound);
        }
        Ok(GeocodeOutcome::Found(vec![
            "45.50".to_string(),
            "45.54".to_string(),
            "-122.70".to_string(),
            "-122.64".to_string(),
        ]))
    }
}

/// Sensor network that only reports sensors inside the requested box
struct FieldOfSensors {
    rows: Vec<Value>,
    calls: AtomicUsize,
}

#[async_trait]
impl SensorSource for FieldOfSensors {
    async fn sensors_in(&self, bbox: &BoundingBox) -> Result<RawSensorPayload> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let data = self
            .rows
            .iter()
            .filter(|row| {
                let lat = row[2].as_f64().unwrap_or(f64::NAN);
                let lon = row[3].as_f64().unwrap_or(f64::NAN);
                bbox.contains(lon, lat)
            })
            .map(|row| row.as_array().cloned().unwrap_or_default())
            .collect();
        Ok(RawSensorPayload {
            fields: Vec::new(),
            data,
        })
    }
}

fn sensor(index: i64, lat: f64, lon: f64, pm2_5: f64) -> Value {
    json!([index, format!("sensor-{}", index), lat, lon, 30, pm2_5, pm2_5, pm2_5, pm2_5, pm2_5, pm2_5])
}

fn fixture(rows: Vec<Value>) -> (Arc<StaticGeocoder>, Arc<FieldOfSensors>, AppState) {
    let geocoder = Arc::new(StaticGeocoder {
        calls: AtomicUsize::new(0),
    });
    let sensors = Arc::new(FieldOfSensors {
        rows,
        calls: AtomicUsize::new(0),
    });
    let state = AppState::with_sources(
        Arc::clone(&geocoder) as Arc<dyn Geocoder>,
        Arc::clone(&sensors) as Arc<dyn SensorSource>,
        &AirScopeConfig::default(),
    );
    (geocoder, sensors, state)
}

mod config_tests {
    use super::*;

    #[test]
    fn test_config_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.yaml");

        let mut config = AirScopeConfig::new();
        config.interpolation.policy = PolicyKind::Nearest;
        config.cache.ttl_secs = 60;
        config.save(&config_path).unwrap();

        let loaded = AirScopeConfig::load(&config_path).unwrap();
        assert_eq!(loaded.interpolation.policy, PolicyKind::Nearest);
        assert_eq!(loaded.interpolation.policy(), InterpolationPolicy::NearestNeighbor);
        assert_eq!(loaded.cache.ttl_secs, 60);
        assert!(validate_config_result(&loaded).is_ok());
    }

    #[test]
    fn test_credentials_fail_fast() {
        let config = AirScopeConfig::default();
        let err = Credentials::from_lookup(&config, |name| {
            (name == "LOC_IQ_KEY").then(|| "geo-key".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, AirScopeError::MissingCredential(ref v) if v == "API_KEY"));
    }
}

mod pipeline_tests {
    use super::*;

    #[tokio::test]
    async fn test_dense_area_maps_without_expanding() {
        let (_, sensors, state) = fixture(vec![
            sensor(1, 45.51, -122.68, 6.0),
            sensor(2, 45.53, -122.66, 14.0),
            sensor(3, 45.52, -122.65, 10.0),
        ]);
        let query = LocationQuery::parse("Portland, OR").unwrap();

        let SearchOutcome::Found { table, expanded } = state.search.search(&query).await.unwrap()
        else {
            panic!("expected sensors");
        };
        assert!(!expanded);
        assert_eq!(table.len(), 3);
        assert_eq!(sensors.calls.load(Ordering::SeqCst), 1);

        let map = interpolate(&table, expanded, state.policy).unwrap();
        assert_eq!(map.grid.len(), GRID_SIZE * GRID_SIZE);
        assert_eq!(map.policy, "knn");

        // Every estimate lies within the observed range
        for feature in &map.grid.features {
            let v = feature.properties["pm2.5"].as_f64().unwrap();
            assert!((6.0..=14.0).contains(&v), "estimate {} out of range", v);
        }
    }

    #[tokio::test]
    async fn test_sparse_area_expands_until_two_sensors() {
        // One sensor just outside the factor-0 box, another further out
        let (geocoder, sensors, state) = fixture(vec![
            sensor(1, 45.42, -122.70, 9.0),
            sensor(2, 45.70, -122.60, 11.0),
        ]);
        let query = LocationQuery::parse("Portland, OR").unwrap();

        let SearchOutcome::Found { table, expanded } = state.search.search(&query).await.unwrap()
        else {
            panic!("expected sensors");
        };

        // Factor 1 finds one sensor and keeps going; factor 2 finds both
        assert!(expanded);
        assert_eq!(table.len(), 2);
        assert_eq!(sensors.calls.load(Ordering::SeqCst), 3);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_repeated_search_is_served_from_cache() {
        let (geocoder, sensors, state) = fixture(vec![sensor(1, 45.52, -122.67, 7.0)]);
        let query = LocationQuery::parse("Portland, OR").unwrap();

        let first = state.search.search(&query).await.unwrap();
        let second = state.search.search(&query).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(sensors.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_coverage_reports_largest_box() {
        let (_, sensors, state) = fixture(vec![sensor(1, 10.0, -10.0, 7.0)]);
        let query = LocationQuery::parse("97201").unwrap();

        let SearchOutcome::Empty { bbox, polygon } = state.search.search(&query).await.unwrap()
        else {
            panic!("expected empty coverage");
        };
        assert_eq!(sensors.calls.load(Ordering::SeqCst), 4);
        // 0.4 for factor 3, 0.1 for the postal code
        assert!((bbox.min_lat() - 45.0).abs() < 1e-9);
        assert!((bbox.max_lon() - (-122.14)).abs() < 1e-9);

        let Geometry::Polygon { coordinates } = polygon else {
            panic!("expected a polygon");
        };
        assert_eq!(
            coordinates[0],
            vec![
                [bbox.min_lon(), bbox.min_lat()],
                [bbox.min_lon(), bbox.max_lat()],
                [bbox.max_lon(), bbox.max_lat()],
                [bbox.max_lon(), bbox.min_lat()],
                [bbox.min_lon(), bbox.min_lat()],
            ]
        );
    }

    #[test]
    fn test_sensor_points_round_trip() {
        let payload: RawSensorPayload = serde_json::from_value(json!({
            "data": [sensor(1, 45.51, -122.68, 6.0), sensor(2, 45.53, -122.66, 14.0)]
        }))
        .unwrap();
        let table = SensorTable::from_payload(&payload).unwrap();

        let text = serde_json::to_string(&table.to_feature_collection().unwrap()).unwrap();
        let decoded = SensorTable::from_feature_collection(&serde_json::from_str(&text).unwrap())
            .unwrap();
        assert_eq!(decoded, table);
    }
}

mod server_tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn get_json(state: AppState, uri: &str) -> (StatusCode, Value) {
        let response = MapServer::router(Arc::new(state))
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_points_endpoint_end_to_end() {
        let (_, _, state) = fixture(vec![
            sensor(1, 45.51, -122.68, 6.0),
            sensor(2, 45.53, -122.66, 14.0),
        ]);

        let (status, body) = get_json(state, "/points/Portland,%20OR").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["expanded"], json!(false));
        let centroid = body["centroid"].as_array().unwrap();
        assert!((centroid[0].as_f64().unwrap() - (-122.67)).abs() < 1e-9);
        assert!((centroid[1].as_f64().unwrap() - 45.52).abs() < 1e-9);
        assert_eq!(body["sensors"]["type"], json!("FeatureCollection"));
    }

    #[tokio::test]
    async fn test_invalid_location_is_bad_request() {
        let (_, sensors, state) = fixture(vec![]);
        let (status, body) = get_json(state, "/points/nowhere").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "verify location is in the United States"}));
        assert_eq!(sensors.calls.load(Ordering::SeqCst), 0);
    }
}
