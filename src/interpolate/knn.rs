//! Inverse-distance weighted k-nearest-neighbour sampling

use super::nearest::distance;
use super::{cell_value, Extent, GRID_SIZE, VALUE_PROPERTY};
use crate::geo::{Feature, FeatureCollection, Geometry};

/// Side of the square drawn for each sample point (degrees)
pub const KNN_CELL_SIDE: f64 = 0.01;

/// `count` evenly spaced values from `start` to `end`, both included
fn linspace(start: f64, end: f64, count: usize) -> impl Iterator<Item = f64> {
    let step = if count > 1 {
        (end - start) / (count - 1) as f64
    } else {
        0.0
    };
    (0..count).map(move |i| if i + 1 == count { end } else { start + step * i as f64 })
}

/// Weighted estimate at `target` from its `k` nearest points
///
/// Weights are `1/d`. When the target coincides with one or more points only
/// those points count, equally weighted. Neighbours at equal distance are
/// taken in input order.
pub fn predict(points: &[[f64; 2]], values: &[f64], target: [f64; 2], k: usize) -> f64 {
    let mut neighbours: Vec<(f64, usize)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (distance(*p, target), i))
        .collect();
    neighbours.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    neighbours.truncate(k.min(points.len()));

    if neighbours.is_empty() {
        return f64::NAN;
    }

    let exact: Vec<usize> = neighbours
        .iter()
        .filter(|(d, _)| *d == 0.0)
        .map(|(_, i)| *i)
        .collect();
    if !exact.is_empty() {
        return exact.iter().map(|i| values[*i]).sum::<f64>() / exact.len() as f64;
    }

    let (weighted, total) = neighbours
        .iter()
        .fold((0.0, 0.0), |(weighted, total), (d, i)| {
            let w = 1.0 / d;
            (weighted + w * values[*i], total + w)
        });
    weighted / total
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// One square per sample point, rows south to north, west to east within a row
pub(super) fn grid(
    points: &[[f64; 2]],
    values: &[f64],
    extent: &Extent,
    k_max: usize,
) -> FeatureCollection {
    let k = k_max.min(points.len());
    let lons: Vec<f64> = linspace(extent.min_lon, extent.max_lon, GRID_SIZE).collect();

    let features = linspace(extent.min_lat, extent.max_lat, GRID_SIZE)
        .flat_map(|lat| lons.iter().map(move |&lon| [lon, lat]))
        .map(|sample| {
            let value = round_tenth(predict(points, values, sample, k));
            Feature::new(Geometry::square(sample[0], sample[1], KNN_CELL_SIDE))
                .with_property(VALUE_PROPERTY, cell_value(value))
        })
        .collect();

    FeatureCollection::new(features)
}
