//! Geocoding client (LocationIQ search API)

use super::query::LocationQuery;
use crate::config::GeocoderConfig;
use crate::metrics;
use crate::{AirScopeError, Result};
use async_trait::async_trait;
use reqwest::header::REFERER;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const SERVICE: &str = "locationiq";

/// What the geocoder said about a query
#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeOutcome {
    /// First result's bounding box as sent upstream:
    /// `[min_lat, max_lat, min_lon, max_lon]`, string-encoded
    Found(Vec<String>),
    /// The service could not geocode the query
    NotFound,
}

/// A geocoding backend
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, query: &LocationQuery) -> Result<GeocodeOutcome>;
}

/// LocationIQ forward-geocoding client restricted to the United States
#[derive(Debug, Clone)]
pub struct LocationIqClient {
    client: Client,
    base_url: String,
    api_key: String,
    referer: String,
    timeout: Duration,
}

impl LocationIqClient {
    pub fn new(config: &GeocoderConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: api_key.into(),
            referer: config.referer.clone(),
            timeout: config.timeout(),
        })
    }

    fn query_params(&self, query: &LocationQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("key", self.api_key.clone()),
            ("format", "json".to_string()),
            ("countrycodes", "us".to_string()),
        ];
        match query.zip5() {
            Some(zip) => params.push(("postalcode", zip.to_string())),
            None => params.push(("q", query.as_str().to_string())),
        }
        params
    }
}

#[async_trait]
impl Geocoder for LocationIqClient {
    async fn geocode(&self, query: &LocationQuery) -> Result<GeocodeOutcome> {
        debug!(query = %query, postal = query.is_postal_code(), "Geocoding location");

        let started = Instant::now();
        let response = self
            .client
            .get(&self.base_url)
            .query(&self.query_params(query))
            .header(REFERER, &self.referer)
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

        let outcome = parse_geocode_body(status, &body);
        if let Err(ref e) = outcome {
            warn!(query = %query, status = %status, error = %e, "Geocoder request failed");
            metrics::record_upstream_error(SERVICE, e.kind());
        }
        outcome
    }
}

/// Interpret a geocoder response body
///
/// An `{"error": "Unable to geocode"}` body means "no such place" whatever the
/// HTTP status; any other error body or non-2xx status is an upstream failure.
pub fn parse_geocode_body(status: StatusCode, body: &str) -> Result<GeocodeOutcome> {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) if status.is_success() => {
            return Err(AirScopeError::MalformedPayload(format!(
                "geocoder returned invalid JSON: {}",
                e
            )))
        }
        Err(_) => {
            return Err(AirScopeError::UpstreamUnavailable(format!(
                "geocoder returned HTTP {}: {}",
                status,
                excerpt(body)
            )))
        }
    };

    if let Some(message) = value.get("error").and_then(Value::as_str) {
        if message.to_ascii_lowercase().contains("unable to geocode") {
            return Ok(GeocodeOutcome::NotFound);
        }
        return Err(AirScopeError::UpstreamUnavailable(format!(
            "geocoder error (HTTP {}): {}",
            status, message
        )));
    }

    if !status.is_success() {
        return Err(AirScopeError::UpstreamUnavailable(format!(
            "geocoder returned HTTP {}: {}",
            status,
            excerpt(body)
        )));
    }

    let places = value.as_array().ok_or_else(|| {
        AirScopeError::MalformedPayload("geocoder response is not an array".to_string())
    })?;

    let Some(first) = places.first() else {
        return Ok(GeocodeOutcome::NotFound);
    };

    let bounds = first
        .get("boundingbox")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            AirScopeError::MalformedPayload("first result has no boundingbox".to_string())
        })?;

    let bounds = bounds
        .iter()
        .map(|v| match v {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(AirScopeError::MalformedPayload(format!(
                "boundingbox entry is not a number: {}",
                other
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(GeocodeOutcome::Found(bounds))
}

fn excerpt(body: &str) -> String {
    body.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_found() {
        let body = r#"[{"place_id":"1","boundingbox":["40.7","40.8","-74.0","-73.9"]},
                       {"place_id":"2","boundingbox":["0","1","0","1"]}]"#;
        let outcome = parse_geocode_body(StatusCode::OK, body).unwrap();
        assert_eq!(
            outcome,
            GeocodeOutcome::Found(vec![
                "40.7".to_string(),
                "40.8".to_string(),
                "-74.0".to_string(),
                "-73.9".to_string()
            ])
        );
    }

    #[test]
    fn test_parse_unable_to_geocode() {
        let body = r#"{"error":"Unable to geocode"}"#;
        assert_eq!(
            parse_geocode_body(StatusCode::NOT_FOUND, body).unwrap(),
            GeocodeOutcome::NotFound
        );
        assert_eq!(
            parse_geocode_body(StatusCode::OK, body).unwrap(),
            GeocodeOutcome::NotFound
        );
        assert_eq!(
            parse_geocode_body(StatusCode::OK, "[]").unwrap(),
            GeocodeOutcome::NotFound
        );
    }

    #[test]
    fn test_parse_other_errors() {
        let err = parse_geocode_body(StatusCode::UNAUTHORIZED, r#"{"error":"Invalid key"}"#)
            .unwrap_err();
        assert!(matches!(err, AirScopeError::UpstreamUnavailable(_)));

        let err = parse_geocode_body(StatusCode::BAD_GATEWAY, "<html>oops</html>").unwrap_err();
        assert!(matches!(err, AirScopeError::UpstreamUnavailable(_)));

        let err = parse_geocode_body(StatusCode::OK, r#"[{"place_id":"1"}]"#).unwrap_err();
        assert!(matches!(err, AirScopeError::MalformedPayload(_)));
    }

    #[test]
    fn test_query_params() {
        let client = LocationIqClient::new(&GeocoderConfig::default(), "k").unwrap();

        let zip = LocationQuery::parse("02134-1234").unwrap();
        let params = client.query_params(&zip);
        assert!(params.contains(&("postalcode", "02134".to_string())));
        assert!(params.contains(&("countrycodes", "us".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "q"));

        let place = LocationQuery::parse("Portland, OR").unwrap();
        let params = client.query_params(&place);
        assert!(params.contains(&("q", "Portland, OR".to_string())));
        assert!(params.contains(&("format", "json".to_string())));
    }
}
