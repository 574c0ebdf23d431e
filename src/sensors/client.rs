//! Sensor network client (PurpleAir sensors API)

use super::table::SENSOR_FIELDS;
use crate::config::SensorNetworkConfig;
use crate::geo::BoundingBox;
use crate::metrics;
use crate::{AirScopeError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const SERVICE: &str = "purpleair";

/// Outdoor sensors only
const OUTDOOR_LOCATION_TYPE: &str = "0";

/// Decoded sensors response: rows laid out by `fields`, or in
/// [`SENSOR_FIELDS`] order when the network omits them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSensorPayload {
    /// Field names echoed by the network, when present
    #[serde(default)]
    pub fields: Vec<String>,
    pub data: Vec<Vec<Value>>,
}

impl RawSensorPayload {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A source of point-sensor readings
#[async_trait]
pub trait SensorSource: Send + Sync {
    async fn sensors_in(&self, bbox: &BoundingBox) -> Result<RawSensorPayload>;
}

/// PurpleAir API client
#[derive(Debug, Clone)]
pub struct PurpleAirClient {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl PurpleAirClient {
    pub fn new(config: &SensorNetworkConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: api_key.into(),
            timeout: config.timeout(),
        })
    }

    /// Query string for a box: north-west and south-east corners
    fn query_params(bbox: &BoundingBox) -> Vec<(&'static str, String)> {
        vec![
            ("fields", SENSOR_FIELDS.join(",")),
            ("location_type", OUTDOOR_LOCATION_TYPE.to_string()),
            ("nwlng", bbox.min_lon().to_string()),
            ("nwlat", bbox.max_lat().to_string()),
            ("selng", bbox.max_lon().to_string()),
            ("selat", bbox.min_lat().to_string()),
        ]
    }
}

#[async_trait]
impl SensorSource for PurpleAirClient {
    async fn sensors_in(&self, bbox: &BoundingBox) -> Result<RawSensorPayload> {
        debug!(bbox = ?bbox, "Fetching sensors");

        let started = Instant::now();
        let response = self
            .client
            .get(&self.base_url)
            .query(&Self::query_params(bbox))
            .header("X-API-Key", &self.api_key)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                let err = AirScopeError::from(e);
                metrics::record_upstream_error(SERVICE, err.kind());
                err
            })?;

        let status = response.status();
        let body = response.text().await?;
        metrics::record_upstream_duration(SERVICE, started.elapsed().as_secs_f64());

        let payload = parse_sensors_body(status, &body);
        match payload {
            Ok(ref p) => debug!(rows = p.len(), "Sensor network responded"),
            Err(ref e) => {
                warn!(status = %status, error = %e, "Sensor request failed");
                metrics::record_upstream_error(SERVICE, e.kind());
            }
        }
        payload
    }
}

/// Interpret a sensors response body
pub fn parse_sensors_body(status: StatusCode, body: &str) -> Result<RawSensorPayload> {
    if !status.is_success() {
        let detail = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| {
                let error = v.get("error")?.as_str()?.to_string();
                let description = v.get("description").and_then(Value::as_str);
                Some(match description {
                    Some(d) => format!("{}: {}", error, d),
                    None => error,
                })
            })
            .unwrap_or_else(|| body.chars().take(200).collect());
        return Err(AirScopeError::UpstreamUnavailable(format!(
            "sensor network returned HTTP {}: {}",
            status, detail
        )));
    }

    serde_json::from_str(body).map_err(|e| {
        AirScopeError::MalformedPayload(format!("sensor response does not decode: {}", e))
    })
}
