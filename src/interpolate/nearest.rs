//! Nearest-neighbour lattice

use super::{cell_value, Extent, GRID_SIZE, VALUE_PROPERTY};
use crate::geo::{Feature, FeatureCollection, Geometry};

pub(super) fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

/// Index of the point closest to `target`; ties go to the earlier point
pub fn nearest_index(points: &[[f64; 2]], target: [f64; 2]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, point) in points.iter().enumerate() {
        let d = distance(*point, target);
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((i, d)),
        }
    }
    best.map(|(i, _)| i)
}

/// Edge `i` of `GRID_SIZE` equal divisions of `[min, max]`
fn edge(min: f64, max: f64, i: usize) -> f64 {
    min + (max - min) * i as f64 / GRID_SIZE as f64
}

/// One polygon per lattice cell, rows south to north, west to east within a row
pub(super) fn grid(points: &[[f64; 2]], values: &[f64], extent: &Extent) -> FeatureCollection {
    let mut features = Vec::with_capacity(GRID_SIZE * GRID_SIZE);

    for row in 0..GRID_SIZE {
        let south = edge(extent.min_lat, extent.max_lat, row);
        let north = edge(extent.min_lat, extent.max_lat, row + 1);

        for col in 0..GRID_SIZE {
            let west = edge(extent.min_lon, extent.max_lon, col);
            let east = edge(extent.min_lon, extent.max_lon, col + 1);
            let centre = [(west + east) / 2.0, (south + north) / 2.0];

            let value = nearest_index(points, centre)
                .map(|i| values[i])
                .unwrap_or(f64::NAN);

            let cell = Geometry::polygon(vec![
                [west, south],
                [west, north],
                [east, north],
                [east, south],
            ]);
            features.push(Feature::new(cell).with_property(VALUE_PROPERTY, cell_value(value)));
        }
    }

    FeatureCollection::new(features)
}
