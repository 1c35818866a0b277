//! Areas inside value ranges

use serde::{Deserialize, Serialize};
use postfire_core::raster::{Raster, Region, SamplingGrid};
use postfire_core::{Error, Result};
use tracing::debug;

use super::cell_area::CellAreaModel;
use crate::maybe_rayon::row_partials;

/// Open interval `(lower, upper)` with a report label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaRange {
    pub lower: f64,
    pub upper: f64,
    pub label: String,
}

impl AreaRange {
    pub fn new(lower: f64, upper: f64, label: impl Into<String>) -> Self {
        Self { lower, upper, label: label.into() }
    }

    /// `lower < v < upper`
    pub fn contains(&self, v: f64) -> bool {
        v > self.lower && v < self.upper
    }
}

/// Area covered by one range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeArea {
    pub label: String,
    pub area_m2: f64,
}

impl RangeArea {
    pub fn area_km2(&self) -> f64 {
        self.area_m2 / 1e6
    }
}

/// Area of the valid cells of `layer` inside `region` falling strictly
/// within each range, in input order.
///
/// Ranges are independent: overlaps are counted in each range and gaps
/// are simply not counted. Each sample contributes its true ground area.
pub fn area_in_ranges(
    layer: &Raster<f64>,
    region: &Region,
    resolution: f64,
    ranges: &[AreaRange],
) -> Result<Vec<RangeArea>> {
    if let Some(bad) = ranges.iter().find(|r| r.lower.is_nan() || r.upper.is_nan()) {
        return Err(Error::invalid_parameter(
            "range",
            format!("({}, {})", bad.lower, bad.upper),
            format!("bounds of '{}' must not be NaN", bad.label),
        ));
    }

    let sums = tally(layer, region, resolution, |v, area, acc: &mut Vec<f64>| {
        for (sum, range) in acc.iter_mut().zip(ranges) {
            if range.contains(v) {
                *sum += area;
            }
        }
    }, ranges.len())?;

    debug!(ranges = ranges.len(), "range areas");
    Ok(ranges
        .iter()
        .zip(sums)
        .map(|(r, area_m2)| RangeArea { label: r.label.clone(), area_m2 })
        .collect())
}

/// Ground area of all valid cells of `layer` inside `region`, in m²
pub fn total_valid_area(layer: &Raster<f64>, region: &Region, resolution: f64) -> Result<f64> {
    let sums = tally(layer, region, resolution, |_, area, acc: &mut Vec<f64>| acc[0] += area, 1)?;
    Ok(sums[0])
}

/// Sample `layer` and accumulate `width` area sums per row, folded in row order
fn tally<F>(layer: &Raster<f64>, region: &Region, resolution: f64, add: F, width: usize) -> Result<Vec<f64>>
where
    F: Fn(f64, f64, &mut Vec<f64>) + Sync + Send,
{
    let grid = SamplingGrid::new(layer, region, resolution)?;
    let model = CellAreaModel::for_raster(layer);
    let data = layer.data();

    let partials = row_partials(grid.rows(), |j| {
        let mut acc = vec![0.0; width];
        for s in grid.row_samples(layer, j) {
            let v = data[(s.row, s.col)];
            if !layer.is_nodata(v) {
                add(v, model.area_at(s.y, resolution), &mut acc);
            }
        }
        acc
    });

    Ok(partials.into_iter().fold(vec![0.0; width], |mut total, row| {
        for (t, r) in total.iter_mut().zip(row) {
            *t += r;
        }
        total
    }))
}
