//! Cached sensor fetches

use super::client::{RawSensorPayload, SensorSource};
use crate::cache::{CacheKey, TtlCache};
use crate::geo::BoundingBox;
use crate::Result;
use std::sync::Arc;

/// Fetches sensors inside a box, memoized on the exact corner coordinates
pub struct SensorFetcher {
    source: Arc<dyn SensorSource>,
    cache: Arc<TtlCache<RawSensorPayload>>,
}

impl SensorFetcher {
    pub fn new(source: Arc<dyn SensorSource>, cache: Arc<TtlCache<RawSensorPayload>>) -> Self {
        Self { source, cache }
    }

    pub async fn fetch(&self, bbox: &BoundingBox) -> Result<Arc<RawSensorPayload>> {
        let key = CacheKey::builder("sensors")
            .arg("nwlng", bbox.min_lon())
            .arg("nwlat", bbox.max_lat())
            .arg("selng", bbox.max_lon())
            .arg("selat", bbox.min_lat())
            .build();

        self.cache
            .try_get_or_compute(key, || self.source.sensors_in(bbox))
            .await
    }
}
