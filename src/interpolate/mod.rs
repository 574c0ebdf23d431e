//! Grid interpolation of sensor readings
//!
//! Two policies turn a [`SensorTable`] into a grid of polygons carrying a
//! PM2.5 estimate:
//!
//! - **nearest**: a 100×100 lattice of cells over the padded sensor extent,
//!   each valued by the sensor closest to its centre
//! - **knn**: 100×100 sample points, each valued by inverse-distance
//!   weighting of its `k` nearest sensors and drawn as a small square
//!
//! Distances are Euclidean in longitude/latitude degrees.

mod knn;
mod nearest;

use crate::geo::FeatureCollection;
use crate::sensors::SensorTable;
use crate::{AirScopeError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub use knn::{predict, KNN_CELL_SIDE};
pub use nearest::nearest_index;

/// Lattice resolution along each axis
pub const GRID_SIZE: usize = 100;

/// Margin added around the sensor extent (degrees)
pub const EXTENT_PAD_DEGREES: f64 = 0.01;

/// Name of the per-cell value property
pub const VALUE_PROPERTY: &str = "pm2.5";

/// How sensor readings are spread over the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationPolicy {
    NearestNeighbor,
    WeightedKnn { k_max: usize },
}

impl InterpolationPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            InterpolationPolicy::NearestNeighbor => "nearest",
            InterpolationPolicy::WeightedKnn { .. } => "knn",
        }
    }
}

impl Default for InterpolationPolicy {
    fn default() -> Self {
        InterpolationPolicy::WeightedKnn { k_max: 5 }
    }
}

/// Axis-aligned extent of a point set; may be degenerate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Extent {
    /// Extent of `(lon, lat)` points, `None` when there are none
    pub fn of(points: &[[f64; 2]]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut extent = Self {
            min_lon: first[0],
            min_lat: first[1],
            max_lon: first[0],
            max_lat: first[1],
        };
        for [lon, lat] in rest {
            extent.min_lon = extent.min_lon.min(*lon);
            extent.max_lon = extent.max_lon.max(*lon);
            extent.min_lat = extent.min_lat.min(*lat);
            extent.max_lat = extent.max_lat.max(*lat);
        }
        Some(extent)
    }

    pub fn padded(&self, degrees: f64) -> Self {
        Self {
            min_lon: self.min_lon - degrees,
            min_lat: self.min_lat - degrees,
            max_lon: self.max_lon + degrees,
            max_lat: self.max_lat + degrees,
        }
    }

    /// `[[south, west], [north, east]]`, the order web map clients fit to
    pub fn corners(&self) -> [[f64; 2]; 2] {
        [[self.min_lat, self.min_lon], [self.max_lat, self.max_lon]]
    }
}

/// Interpolated map for one search
#[derive(Debug, Clone, Serialize)]
pub struct MapPayload {
    pub grid: FeatureCollection,
    pub sensors: FeatureCollection,
    /// Mean sensor position `[lon, lat]`
    pub centroid: [f64; 2],
    pub expanded: bool,
    /// Unpadded sensor extent, k-NN only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<[[f64; 2]; 2]>,
    pub policy: &'static str,
    pub generated_at: DateTime<Utc>,
}

/// Interpolate the table's instantaneous PM2.5 onto a grid
pub fn interpolate(
    table: &SensorTable,
    expanded: bool,
    policy: InterpolationPolicy,
) -> Result<MapPayload> {
    let points = table.positions();
    let extent = Extent::of(&points).ok_or(AirScopeError::EmptyTable)?;
    let values: Vec<f64> = table.iter().map(|r| r.pm2_5_or_nan()).collect();
    let padded = extent.padded(EXTENT_PAD_DEGREES);

    let (grid, bounds) = match policy {
        InterpolationPolicy::NearestNeighbor => (nearest::grid(&points, &values, &padded), None),
        InterpolationPolicy::WeightedKnn { k_max } => {
            if k_max == 0 {
                return Err(AirScopeError::Config(
                    "k-NN interpolation needs k_max >= 1".to_string(),
                ));
            }
            (
                knn::grid(&points, &values, &padded, k_max),
                Some(extent.corners()),
            )
        }
    };

    let n = points.len() as f64;
    let centroid = [
        points.iter().map(|p| p[0]).sum::<f64>() / n,
        points.iter().map(|p| p[1]).sum::<f64>() / n,
    ];

    tracing::debug!(
        sensors = points.len(),
        cells = grid.len(),
        policy = policy.name(),
        "Interpolated sensor grid"
    );

    Ok(MapPayload {
        grid,
        sensors: table.to_feature_collection()?,
        centroid,
        expanded,
        bounds,
        policy: policy.name(),
        generated_at: Utc::now(),
    })
}

/// JSON value for a cell estimate: `null` when it is not a finite number
fn cell_value(value: f64) -> serde_json::Value {
    serde_json::Number::from_f64(value)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}
