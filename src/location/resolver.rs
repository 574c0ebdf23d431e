//! Location resolver: query → padded bounding box

use super::client::{GeocodeOutcome, Geocoder};
use super::query::LocationQuery;
use crate::cache::{CacheKey, TtlCache};
use crate::geo::BoundingBox;
use crate::{AirScopeError, Result};
use serde::Serialize;
use std::sync::Arc;

/// Padding added to every edge at expansion factor 0 (degrees)
pub const BASE_PAD_DEGREES: f64 = 0.05;

/// Extra padding for postal-code boxes, which come back tighter than a
/// useful sensor search area (degrees)
pub const POSTAL_PAD_DEGREES: f64 = 0.1;

/// Message returned when the geocoder cannot place the query
pub const INVALID_LOCATION_MESSAGE: &str = "verify location is in the United States";

/// Caller-facing error body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub message: String,
}

impl ErrorPayload {
    pub fn invalid_location() -> Self {
        Self {
            message: INVALID_LOCATION_MESSAGE.to_string(),
        }
    }
}

/// Result of resolving a query
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(BoundingBox),
    Invalid(ErrorPayload),
}

impl Resolution {
    pub fn is_valid(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

/// Padding applied at a given expansion factor: `0.05 * 2^factor`
pub fn expansion_pad(factor: u32) -> f64 {
    BASE_PAD_DEGREES * 2f64.powi(factor as i32)
}

/// Turns queries into search boxes via a geocoder, memoized per `(query, factor)`
pub struct LocationResolver {
    geocoder: Arc<dyn Geocoder>,
    cache: Arc<TtlCache<Resolution>>,
}

impl LocationResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>, cache: Arc<TtlCache<Resolution>>) -> Self {
        Self { geocoder, cache }
    }

    /// Resolve `query` to a bounding box grown by the padding for `factor`
    ///
    /// Both valid and invalid outcomes are cached; transport failures are not.
    pub async fn resolve(&self, query: &LocationQuery, factor: u32) -> Result<Resolution> {
        let key = CacheKey::builder("geocode")
            .arg("query", query.as_str())
            .arg("factor", factor)
            .build();

        let resolution = self
            .cache
            .try_get_or_compute(key, || self.resolve_uncached(query, factor))
            .await?;

        Ok(Resolution::clone(&resolution))
    }

    async fn resolve_uncached(&self, query: &LocationQuery, factor: u32) -> Result<Resolution> {
        match self.geocoder.geocode(query).await? {
            GeocodeOutcome::NotFound => {
                tracing::info!(query = %query, "Geocoder could not place query");
                Ok(Resolution::Invalid(ErrorPayload::invalid_location()))
            }
            GeocodeOutcome::Found(raw) => {
                let bbox = padded_bounds(&raw, query, factor)?;
                tracing::debug!(query = %query, factor, bbox = ?bbox, "Resolved location");
                Ok(Resolution::Resolved(bbox))
            }
        }
    }
}

/// Parse the geocoder's `[min_lat, max_lat, min_lon, max_lon]` strings and pad
///
/// The factor padding is applied first, then the postal-code padding.
pub fn padded_bounds(raw: &[String], query: &LocationQuery, factor: u32) -> Result<BoundingBox> {
    if raw.len() != 4 {
        return Err(AirScopeError::MalformedPayload(format!(
            "boundingbox has {} entries, expected 4",
            raw.len()
        )));
    }

    let mut values = [0.0f64; 4];
    for (slot, text) in values.iter_mut().zip(raw) {
        *slot = text.trim().parse::<f64>().map_err(|e| {
            AirScopeError::MalformedPayload(format!("boundingbox entry {:?}: {}", text, e))
        })?;
    }
    let [min_lat, max_lat, min_lon, max_lon] = values;

    let pad = expansion_pad(factor);
    let bbox = BoundingBox::new(min_lat - pad, max_lat + pad, min_lon - pad, max_lon + pad)
        .map_err(|e| AirScopeError::MalformedPayload(e.to_string()))?;

    if query.is_postal_code() {
        Ok(bbox.padded(POSTAL_PAD_DEGREES))
    } else {
        Ok(bbox)
    }
}
