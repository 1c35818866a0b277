//! Regions of interest and resolution-independent sampling
//!
//! Statistics are computed "over a region at a sampling resolution": the
//! region's extent is covered by a lattice of sample points spaced
//! `resolution` apart, and every sample reads the layer cell that contains
//! it (nearest-cell lookup). At the layer's own resolution over an aligned
//! extent this visits each cell exactly once.

use crate::error::{Error, Result};
use crate::raster::{Raster, RasterElement};

/// Area of interest for zonal statistics
#[derive(Debug, Clone, Default)]
pub enum Region {
    /// The full extent of the layer
    #[default]
    Full,
    /// Axis-aligned box in layer coordinates
    Bounds {
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    },
    /// Cells where the mask is non-zero; must share the layer's grid
    Mask(Raster<u8>),
}

impl Region {
    /// Box region from `[min_x, min_y, max_x, max_y]`
    pub fn bounds(b: [f64; 4]) -> Result<Self> {
        let [min_x, min_y, max_x, max_y] = b;
        if !(b.iter().all(|v| v.is_finite()) && min_x < max_x && min_y < max_y) {
            return Err(Error::invalid_parameter(
                "region",
                format!("{b:?}"),
                "bounds must be finite with min < max",
            ));
        }
        Ok(Region::Bounds { min_x, min_y, max_x, max_y })
    }

    fn extent<T: RasterElement>(&self, layer: &Raster<T>) -> Option<(f64, f64, f64, f64)> {
        let (lx0, ly0, lx1, ly1) = layer.bounds();
        let (x0, y0, x1, y1) = match self {
            Region::Full | Region::Mask(_) => (lx0, ly0, lx1, ly1),
            Region::Bounds { min_x, min_y, max_x, max_y } => (
                min_x.max(lx0),
                min_y.max(ly0),
                max_x.min(lx1),
                max_y.min(ly1),
            ),
        };
        (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
    }
}

/// One sample of a layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Sample location in layer coordinates
    pub x: f64,
    pub y: f64,
    /// Layer cell that contains the sample
    pub row: usize,
    pub col: usize,
}

/// Lattice of sample points over a region of one layer.
///
/// Rows of the lattice are independent, so callers can reduce them in
/// parallel and fold the per-row partials in row order.
#[derive(Debug, Clone)]
pub struct SamplingGrid<'a> {
    region: &'a Region,
    resolution: f64,
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
    n_cols: usize,
    n_rows: usize,
}

impl<'a> SamplingGrid<'a> {
    /// Build the lattice for `layer` restricted to `region`.
    ///
    /// `resolution` is in layer coordinate units. A mask region must share
    /// the layer's grid. A region that does not overlap the layer yields an
    /// empty lattice.
    pub fn new<T: RasterElement>(layer: &Raster<T>, region: &'a Region, resolution: f64) -> Result<Self> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(Error::invalid_parameter(
                "sampling_resolution",
                resolution,
                "must be a positive finite number",
            ));
        }
        if let Region::Mask(mask) = region {
            layer.ensure_same_grid(mask)?;
        }

        let (min_x, min_y, max_x, max_y) = region.extent(layer).unwrap_or((0.0, 0.0, 0.0, 0.0));
        let span = |len: f64| {
            let n = len / resolution;
            // absorb float noise so an exact multiple does not add a sliver column
            let rounded = n.round();
            if (n - rounded).abs() < 1e-9 { rounded as usize } else { n.ceil() as usize }
        };

        Ok(Self {
            region,
            resolution,
            min_x,
            max_x,
            min_y,
            max_y,
            n_cols: span(max_x - min_x),
            n_rows: span(max_y - min_y),
        })
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Number of lattice rows
    pub fn rows(&self) -> usize {
        self.n_rows
    }

    /// Number of lattice columns
    pub fn cols(&self) -> usize {
        self.n_cols
    }

    /// Samples of lattice row `j` (north to south) that fall inside the
    /// region and the layer
    pub fn row_samples<'b, T: RasterElement>(
        &'b self,
        layer: &'b Raster<T>,
        j: usize,
    ) -> impl Iterator<Item = Sample> + 'b {
        let y = self.max_y - (j as f64 + 0.5) * self.resolution;
        let (rows, cols) = layer.shape();
        let transform = *layer.transform();

        (0..self.n_cols).filter_map(move |i| {
            let x = self.min_x + (i as f64 + 0.5) * self.resolution;
            if x >= self.max_x || y <= self.min_y {
                return None;
            }
            let (row, col) = transform.cell_at(x, y, cols, rows)?;
            if let Region::Mask(mask) = self.region {
                let m = mask.data()[(row, col)];
                if m == 0 || mask.is_nodata(m) {
                    return None;
                }
            }
            Some(Sample { x, y, row, col })
        })
    }

    /// All samples, row by row
    pub fn samples<'b, T: RasterElement>(&'b self, layer: &'b Raster<T>) -> impl Iterator<Item = Sample> + 'b {
        (0..self.n_rows).flat_map(move |j| self.row_samples(layer, j))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GeoTransform;

    fn layer() -> Raster<f64> {
        let mut r = Raster::filled(10, 10, 1.0);
        r.set_transform(GeoTransform::new(0.0, 100.0, 10.0, -10.0));
        r
    }

    #[test]
    fn test_native_resolution_visits_every_cell_once() {
        let layer = layer();
        let region = Region::Full;
        let grid = SamplingGrid::new(&layer, &region, 10.0).unwrap();

        let mut seen = vec![0; 100];
        for s in grid.samples(&layer) {
            seen[s.row * 10 + s.col] += 1;
        }
        assert!(seen.iter().all(|&n| n == 1));
    }

    #[test]
    fn test_coarser_resolution_subsamples() {
        let layer = layer();
        let region = Region::Full;
        let grid = SamplingGrid::new(&layer, &region, 20.0).unwrap();
        assert_eq!(grid.samples(&layer).count(), 25);
    }

    #[test]
    fn test_bounds_region() {
        let layer = layer();
        let region = Region::bounds([0.0, 50.0, 50.0, 100.0]).unwrap();
        let grid = SamplingGrid::new(&layer, &region, 10.0).unwrap();
        let samples: Vec<_> = grid.samples(&layer).collect();
        assert_eq!(samples.len(), 25);
        assert!(samples.iter().all(|s| s.row < 5 && s.col < 5));
    }

    #[test]
    fn test_disjoint_region_is_empty() {
        let layer = layer();
        let region = Region::bounds([500.0, 500.0, 600.0, 600.0]).unwrap();
        let grid = SamplingGrid::new(&layer, &region, 10.0).unwrap();
        assert_eq!(grid.samples(&layer).count(), 0);
    }

    #[test]
    fn test_mask_region() {
        let layer = layer();
        let mut mask: Raster<u8> = Raster::new(10, 10);
        mask.set_transform(*layer.transform());
        mask.set(2, 3, 1).unwrap();
        mask.set(7, 7, 1).unwrap();
        let region = Region::Mask(mask);

        let grid = SamplingGrid::new(&layer, &region, 10.0).unwrap();
        let cells: Vec<_> = grid.samples(&layer).map(|s| (s.row, s.col)).collect();
        assert_eq!(cells, vec![(2, 3), (7, 7)]);
    }

    #[test]
    fn test_invalid_resolution() {
        let layer = layer();
        let region = Region::Full;
        assert!(SamplingGrid::new(&layer, &region, 0.0).is_err());
        assert!(SamplingGrid::new(&layer, &region, f64::NAN).is_err());
    }
}
