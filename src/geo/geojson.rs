//! Minimal GeoJSON feature model (RFC 7946 subset: points and polygons)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Geometry of a feature; positions are `[longitude, latitude]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: [f64; 2] },
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
}

impl Geometry {
    pub fn point(lon: f64, lat: f64) -> Self {
        Geometry::Point {
            coordinates: [lon, lat],
        }
    }

    /// Polygon from a single exterior ring; the ring is closed if needed
    pub fn polygon(mut ring: Vec<[f64; 2]>) -> Self {
        if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
            if first != last {
                ring.push(first);
            }
        }
        Geometry::Polygon {
            coordinates: vec![ring],
        }
    }

    /// Axis-aligned square with its south-west corner at `(lon, lat)`
    pub fn square(lon: f64, lat: f64, side: f64) -> Self {
        Self::polygon(vec![
            [lon, lat],
            [lon, lat + side],
            [lon + side, lat + side],
            [lon + side, lat],
        ])
    }
}

/// A geometry with free-form properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            properties: Map::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Ordered collection of features
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
