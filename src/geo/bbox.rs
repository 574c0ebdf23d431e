//! Axis-aligned geographic bounding box

use super::geojson::Geometry;
use crate::{AirScopeError, Result};
use serde::Serialize;

/// Rectangle in WGS84 degrees delimiting a search area
///
/// Always satisfies `min_lat < max_lat` and `min_lon < max_lon`. Values are
/// immutable; padding produces a new box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Result<Self> {
        let all_finite = [min_lat, max_lat, min_lon, max_lon]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(AirScopeError::InvalidBoundingBox(format!(
                "non-finite coordinate in [{}, {}, {}, {}]",
                min_lat, max_lat, min_lon, max_lon
            )));
        }
        if min_lat >= max_lat {
            return Err(AirScopeError::InvalidBoundingBox(format!(
                "min_lat {} must be below max_lat {}",
                min_lat, max_lat
            )));
        }
        if min_lon >= max_lon {
            return Err(AirScopeError::InvalidBoundingBox(format!(
                "min_lon {} must be below max_lon {}",
                min_lon, max_lon
            )));
        }
        Ok(Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }

    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }

    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }

    pub fn max_lon(&self) -> f64 {
        self.max_lon
    }

    /// Grow every edge outward by `degrees`. Negative padding is ignored.
    pub fn padded(&self, degrees: f64) -> Self {
        let pad = degrees.max(0.0);
        Self {
            min_lat: self.min_lat - pad,
            max_lat: self.max_lat + pad,
            min_lon: self.min_lon - pad,
            max_lon: self.max_lon + pad,
        }
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        (self.min_lon..=self.max_lon).contains(&lon) && (self.min_lat..=self.max_lat).contains(&lat)
    }

    /// Closed ring, counter-clockwise from the south-west corner
    pub fn to_ring(&self) -> Vec<[f64; 2]> {
        vec![
            [self.min_lon, self.min_lat],
            [self.min_lon, self.max_lat],
            [self.max_lon, self.max_lat],
            [self.max_lon, self.min_lat],
            [self.min_lon, self.min_lat],
        ]
    }

    pub fn to_polygon(&self) -> Geometry {
        Geometry::Polygon {
            coordinates: vec![self.to_ring()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_inverted_axes() {
        assert!(BoundingBox::new(41.0, 40.0, -74.0, -73.0).is_err());
        assert!(BoundingBox::new(40.0, 41.0, -73.0, -74.0).is_err());
        assert!(BoundingBox::new(40.0, 40.0, -74.0, -73.0).is_err());
        assert!(BoundingBox::new(f64::NAN, 41.0, -74.0, -73.0).is_err());
    }

    #[test]
    fn test_padding_is_symmetric() {
        let bbox = BoundingBox::new(40.0, 41.0, -74.0, -73.0).unwrap();
        let padded = bbox.padded(0.25);
        assert_eq!(padded.min_lat(), 39.75);
        assert_eq!(padded.max_lat(), 41.25);
        assert_eq!(padded.min_lon(), -74.25);
        assert_eq!(padded.max_lon(), -72.75);
        // Original is untouched
        assert_eq!(bbox.min_lat(), 40.0);
    }

    #[test]
    fn test_ring_order() {
        let bbox = BoundingBox::new(40.0, 41.0, -74.0, -73.0).unwrap();
        assert_eq!(
            bbox.to_ring(),
            vec![
                [-74.0, 40.0],
                [-74.0, 41.0],
                [-73.0, 41.0],
                [-73.0, 40.0],
                [-74.0, 40.0],
            ]
        );
    }

    #[test]
    fn test_contains() {
        let bbox = BoundingBox::new(40.0, 41.0, -74.0, -73.0).unwrap();
        assert!(bbox.contains(-73.5, 40.5));
        assert!(!bbox.contains(-72.5, 40.5));
    }
}
