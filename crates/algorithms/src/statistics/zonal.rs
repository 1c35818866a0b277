//! Class statistics and min/max over a region
//!
//! Both walk a [`SamplingGrid`] row by row. Rows are reduced independently
//! and the partials folded in row order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use postfire_core::raster::{Raster, Region, SamplingGrid};
use postfire_core::{Error, Result};
use tracing::debug;

use super::cell_area::CellAreaModel;
use crate::classification::ThresholdLadder;
use crate::maybe_rayon::row_partials;
use crate::normalize::map_valid;

/// Pixel count, area and share of one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub class: i32,
    pub label: String,
    pub pixels: u64,
    /// m²
    pub area: f64,
    /// Percent of valid pixels, rounded to two decimals
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassStatistics {
    /// Valid samples of the class raster inside the region
    pub total_valid_pixels: u64,
    pub total_area: f64,
    /// One record per ladder class, then any other class found, ascending
    pub classes: Vec<ClassRecord>,
}

impl ClassStatistics {
    pub fn get(&self, class: i32) -> Option<&ClassRecord> {
        self.classes.iter().find(|r| r.class == class)
    }
}

/// Per-class pixel counts and area sums
type ClassTally = BTreeMap<i32, (u64, f64)>;

/// Count the classes of `classified` inside `region`, sampled at `resolution`.
///
/// The denominator of the percentages is the number of valid samples, not
/// the number of samples in the region. Projected layers report
/// `pixels * resolution²` as area, geographic layers the sum of true sample
/// areas. Fails with [`Error::EmptyRegion`] when no valid sample exists.
pub fn class_statistics(
    classified: &Raster<i32>,
    region: &Region,
    resolution: f64,
    ladder: &ThresholdLadder,
) -> Result<ClassStatistics> {
    let grid = SamplingGrid::new(classified, region, resolution)?;
    let model = CellAreaModel::for_raster(classified);
    let data = classified.data();

    let partials: Vec<ClassTally> = row_partials(grid.rows(), |j| {
        let mut tally = ClassTally::new();
        for s in grid.row_samples(classified, j) {
            let class = data[(s.row, s.col)];
            if classified.is_nodata(class) {
                continue;
            }
            let entry = tally.entry(class).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += model.area_at(s.y, resolution);
        }
        tally
    });

    let mut tally: ClassTally = (0..ladder.class_count() as i32).map(|c| (c, (0, 0.0))).collect();
    for partial in partials {
        for (class, (pixels, area)) in partial {
            let entry = tally.entry(class).or_insert((0, 0.0));
            entry.0 += pixels;
            entry.1 += area;
        }
    }

    let total: u64 = tally.values().map(|(p, _)| p).sum();
    if total == 0 {
        return Err(Error::EmptyRegion);
    }

    let classes: Vec<ClassRecord> = tally
        .into_iter()
        .map(|(class, (pixels, area))| ClassRecord {
            class,
            label: usize::try_from(class).map(|c| ladder.label(c)).unwrap_or_else(|_| format!("class {class}")),
            pixels,
            area: match model {
                CellAreaModel::Planar => pixels as f64 * resolution * resolution,
                CellAreaModel::Geodesic => area,
            },
            percentage: percentage(pixels, total),
        })
        .collect();
    let total_area = classes.iter().map(|r| r.area).sum();

    debug!(total_valid_pixels = total, classes = classes.len(), "class statistics");
    Ok(ClassStatistics { total_valid_pixels: total, total_area, classes })
}

/// `pixels / total` as a percentage rounded to two decimals
pub fn percentage(pixels: u64, total: u64) -> f64 {
    (pixels as f64 / total as f64 * 10_000.0).round() / 100.0
}

/// Minimum and maximum of the valid samples of `layer` inside `region`.
///
/// Fails with [`Error::EmptyRegion`] when no valid sample exists.
pub fn min_max(layer: &Raster<f64>, region: &Region, resolution: f64) -> Result<(f64, f64)> {
    let grid = SamplingGrid::new(layer, region, resolution)?;
    let data = layer.data();

    let partials: Vec<Option<(f64, f64)>> = row_partials(grid.rows(), |j| {
        grid.row_samples(layer, j)
            .map(|s| data[(s.row, s.col)])
            .filter(|&v| !layer.is_nodata(v))
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((v.min(lo), v.max(hi))),
            })
    });

    partials
        .into_iter()
        .flatten()
        .reduce(|(a_lo, a_hi), (b_lo, b_hi)| (a_lo.min(b_lo), a_hi.max(b_hi)))
        .ok_or(Error::EmptyRegion)
}

/// Rescale to `[0, 100]`: `(v - min) / (max - min) * 100`.
///
/// Values outside `[min, max]` are not clamped.
pub fn rescale_percent(layer: &Raster<f64>, min: f64, max: f64) -> Result<Raster<f64>> {
    if max == min {
        return Err(Error::DegenerateScale { what: "min-max rescale", value: min });
    }
    let span = max - min;
    map_valid(layer, |v| (v - min) / span * 100.0)
}

/// Min/max over the region and the layer rescaled to `[0, 100]` with them
pub fn min_max_normalize(layer: &Raster<f64>, region: &Region, resolution: f64) -> Result<(Raster<f64>, f64, f64)> {
    let (min, max) = min_max(layer, region, resolution)?;
    Ok((rescale_percent(layer, min, max)?, min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::classify;
    use approx::assert_relative_eq;
    use postfire_core::{GeoTransform, CRS};

    fn classes(values: Vec<i32>, rows: usize, cols: usize) -> Raster<i32> {
        let mut r = Raster::from_vec(values, rows, cols).unwrap();
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r.set_nodata(Some(i32::MIN));
        r
    }

    fn two_boundaries() -> ThresholdLadder {
        ThresholdLadder::new(vec![0.3, 0.6]).unwrap()
    }

    #[test]
    fn test_counts_and_percentages() {
        let r = classes(vec![0, 0, 1, 2, 2, 2, 1, i32::MIN, 2], 3, 3);
        let stats = class_statistics(&r, &Region::Full, 1.0, &two_boundaries()).unwrap();

        assert_eq!(stats.total_valid_pixels, 8);
        assert_eq!(stats.get(0).unwrap().pixels, 2);
        assert_eq!(stats.get(1).unwrap().pixels, 2);
        assert_eq!(stats.get(2).unwrap().pixels, 4);
        assert_eq!(stats.get(2).unwrap().percentage, 50.0);
        assert_eq!(stats.get(0).unwrap().area, 2.0);
        assert_eq!(stats.total_area, 8.0);
    }

    #[test]
    fn test_percentages_sum_to_hundred() {
        let values: Vec<i32> = (0..97).map(|i| (i * 7 % 3) as i32).collect();
        let r = classes(values, 1, 97);
        let stats = class_statistics(&r, &Region::Full, 1.0, &two_boundaries()).unwrap();

        let sum: f64 = stats.classes.iter().map(|c| c.percentage).sum();
        assert!((sum - 100.0).abs() <= 0.01 * stats.classes.len() as f64);
    }

    #[test]
    fn test_zero_count_classes_are_listed() {
        let r = classes(vec![1; 4], 2, 2);
        let stats = class_statistics(&r, &Region::Full, 1.0, &two_boundaries()).unwrap();
        assert_eq!(stats.classes.len(), 3);
        assert_eq!(stats.get(0).unwrap().pixels, 0);
        assert_eq!(stats.get(1).unwrap().percentage, 100.0);
        assert_eq!(stats.get(1).unwrap().label, "class 1");
    }

    #[test]
    fn test_empty_region() {
        let r = classes(vec![i32::MIN; 4], 2, 2);
        let err = class_statistics(&r, &Region::Full, 1.0, &two_boundaries()).unwrap_err();
        assert!(matches!(err, Error::EmptyRegion));
    }

    #[test]
    fn test_bounds_region_restricts_samples() {
        let r = classes(vec![0, 2, 0, 2], 2, 2);
        // right half of the 2x2 grid
        let region = Region::bounds([1.0, 0.0, 2.0, 2.0]).unwrap();
        let stats = class_statistics(&r, &region, 1.0, &two_boundaries()).unwrap();
        assert_eq!(stats.total_valid_pixels, 2);
        assert_eq!(stats.get(2).unwrap().percentage, 100.0);
    }

    #[test]
    fn test_mask_region() {
        let r = classes(vec![0, 1, 2, 2], 2, 2);
        let mut mask = Raster::from_vec(vec![1u8, 1, 0, 0], 2, 2).unwrap();
        mask.set_transform(*r.transform());
        let stats = class_statistics(&r, &Region::Mask(mask), 1.0, &two_boundaries()).unwrap();
        assert_eq!(stats.total_valid_pixels, 2);
        assert_eq!(stats.get(2).unwrap().pixels, 0);
    }

    #[test]
    fn test_geographic_area_is_true_area() {
        let mut layer = Raster::filled(10, 10, 0.5);
        layer.set_transform(GeoTransform::new(-3.0, 40.1, 0.01, -0.01));
        layer.set_crs(Some(CRS::wgs84()));
        let r = classify(&layer, &two_boundaries()).unwrap();

        let stats = class_statistics(&r, &Region::Full, 0.01, &two_boundaries()).unwrap();
        let rec = stats.get(1).unwrap();
        assert_eq!(rec.pixels, 100);
        // ~0.01° cells near 40°N are about 852 m by 1110 m
        assert_relative_eq!(rec.area, 100.0 * 852.0 * 1110.0, max_relative = 0.01);
    }

    #[test]
    fn test_min_max_and_rescale() {
        let mut layer = Raster::from_vec(vec![0.2, f64::NAN, 0.7, 0.45], 2, 2).unwrap();
        layer.set_transform(GeoTransform::new(0.0, 2.0, 1.0, -1.0));

        let (lo, hi) = min_max(&layer, &Region::Full, 1.0).unwrap();
        assert_eq!((lo, hi), (0.2, 0.7));

        let (pct, _, _) = min_max_normalize(&layer, &Region::Full, 1.0).unwrap();
        assert_relative_eq!(pct.get(0, 0).unwrap(), 0.0);
        assert_relative_eq!(pct.get(1, 0).unwrap(), 100.0);
        assert_relative_eq!(pct.get(1, 1).unwrap(), 50.0, epsilon = 1e-9);
        assert!(pct.get(0, 1).unwrap().is_nan());
    }

    #[test]
    fn test_rescale_degenerate() {
        let layer = Raster::filled(2, 2, 0.4);
        let (lo, hi) = min_max(&layer, &Region::Full, 1.0).unwrap();
        assert!(matches!(rescale_percent(&layer, lo, hi), Err(Error::DegenerateScale { .. })));
    }

    #[test]
    fn test_min_max_empty() {
        let layer = Raster::filled(2, 2, f64::NAN);
        assert!(matches!(min_max(&layer, &Region::Full, 1.0), Err(Error::EmptyRegion)));
    }
}
