//! Main Raster type

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement};
use ndarray::{Array2, Zip};

/// A georeferenced 2D raster grid.
///
/// `Raster<T>` stores values of type `T` in a 2D grid with associated
/// geographic metadata (transform and CRS). Cells equal to the no-data
/// value, or non-finite floats, are invalid: they are skipped by every
/// transform and statistic and stay invalid in derived layers.
///
/// Rasters are treated as immutable inputs by the analysis engine; every
/// transform builds a new raster.
///
/// # Example
///
/// ```ignore
/// use postfire_core::{GeoTransform, Raster};
///
/// let mut slope: Raster<f64> = Raster::filled(100, 100, 12.5);
/// slope.set_transform(GeoTransform::new(350_000.0, 4_500_000.0, 5.0, -5.0));
/// slope.set(10, 20, f64::NAN)?; // mark a cell invalid
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored in row-major order (row, col)
    data: Array2<T>,
    transform: GeoTransform,
    crs: Option<CRS>,
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from existing row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self::from_array(array))
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    /// Create a raster of another cell type on the same grid, from row-major data.
    ///
    /// The new raster's no-data value is `U::default_nodata()`.
    pub fn derive<U: RasterElement>(&self, data: Vec<U>) -> Result<Raster<U>> {
        let (rows, cols) = self.shape();
        let mut out = Raster::<U>::from_vec(data, rows, cols)?;
        out.transform = self.transform;
        out.crs = self.crs.clone();
        out.nodata = Some(U::default_nodata());
        Ok(out)
    }

    // Dimensions

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        let (rows, cols) = self.shape();
        let cell = self.data.get_mut((row, col)).ok_or(Error::IndexOutOfBounds {
            row,
            col,
            rows,
            cols,
        })?;
        *cell = value;
        Ok(())
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    // Metadata

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    /// Whether coordinates are lon/lat degrees
    pub fn is_geographic(&self) -> bool {
        self.crs.as_ref().is_some_and(CRS::is_geographic)
    }

    // Validity

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Whether the cell at (row, col) holds a usable value
    pub fn is_valid_at(&self, row: usize, col: usize) -> Result<bool> {
        let value = self.get(row, col)?;
        Ok(!self.is_nodata(value))
    }

    /// Number of valid cells in the whole raster
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|&&v| !self.is_nodata(v)).count()
    }

    // Grid identity

    /// Short human-readable description of the grid, used in mismatch errors
    pub fn grid_summary(&self) -> String {
        format!(
            "{}x{} cells @ ({}, {}) res {}x{}",
            self.cols(),
            self.rows(),
            self.transform.origin_x,
            self.transform.origin_y,
            self.transform.pixel_width,
            self.transform.pixel_height
        )
    }

    /// Whether `other` covers the same cells: same shape, aligned transform
    /// and, when both declare one, an equivalent CRS.
    pub fn same_grid<U: RasterElement>(&self, other: &Raster<U>) -> bool {
        let crs_ok = match (self.crs(), other.crs()) {
            (Some(a), Some(b)) => a.is_equivalent(b),
            _ => true,
        };
        self.shape() == other.shape() && self.transform.aligned_with(other.transform()) && crs_ok
    }

    /// Fail with [`Error::GridMismatch`] unless `other` shares this grid.
    ///
    /// No resampling is ever done implicitly.
    pub fn ensure_same_grid<U: RasterElement>(&self, other: &Raster<U>) -> Result<()> {
        if self.same_grid(other) {
            Ok(())
        } else {
            Err(Error::GridMismatch {
                expected: self.grid_summary(),
                found: other.grid_summary(),
            })
        }
    }

    // Masking

    /// Copy of this raster with cells invalidated wherever `mask` is zero
    /// or invalid. The mask must share this raster's grid.
    pub fn mask_with(&self, mask: &Raster<u8>) -> Result<Self> {
        self.ensure_same_grid(mask)?;
        let nodata = self.nodata.unwrap_or_else(T::default_nodata);
        let mut out = self.clone();
        out.nodata = Some(nodata);
        Zip::from(&mut out.data).and(&mask.data).for_each(|v, &m| {
            if m == 0 || mask.is_nodata(m) {
                *v = nodata;
            }
        });
        Ok(out)
    }

    /// Copy of this raster with invalid cells replaced by `value`
    pub fn fill_nodata(&self, value: T) -> Self {
        let mut out = self.clone();
        let nodata = self.nodata;
        out.data.mapv_inplace(|v| if v.is_nodata(nodata) { value } else { v });
        out
    }

    // Statistics

    /// Calculate basic statistics (min, max, mean, count of valid cells)
    pub fn statistics(&self) -> RasterStatistics<T> {
        let mut min: Option<T> = None;
        let mut max: Option<T> = None;
        let mut sum: f64 = 0.0;
        let mut count: usize = 0;

        for &value in self.data.iter().filter(|&&v| !self.is_nodata(v)) {
            if min.is_none_or(|m| value < m) {
                min = Some(value);
            }
            if max.is_none_or(|m| value > m) {
                max = Some(value);
            }
            if let Some(v) = value.to_f64() {
                sum += v;
                count += 1;
            }
        }

        RasterStatistics {
            min,
            max,
            mean: (count > 0).then(|| sum / count as f64),
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

/// Basic statistics for a raster
#[derive(Debug, Clone)]
pub struct RasterStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(value: f64) -> Raster<f64> {
        let mut r = Raster::filled(4, 4, value);
        r.set_transform(GeoTransform::new(0.0, 40.0, 10.0, -10.0));
        r
    }

    #[test]
    fn test_raster_creation() {
        let raster: Raster<f32> = Raster::new(100, 200);
        assert_eq!(raster.rows(), 100);
        assert_eq!(raster.cols(), 200);
        assert_eq!(raster.shape(), (100, 200));
    }

    #[test]
    fn test_raster_access() {
        let mut raster: Raster<f32> = Raster::new(10, 10);
        raster.set(5, 5, 42.0).unwrap();
        assert_eq!(raster.get(5, 5).unwrap(), 42.0);
        assert!(raster.set(10, 0, 1.0).is_err());
    }

    #[test]
    fn test_raster_statistics_skip_nodata() {
        let mut raster: Raster<f64> = Raster::new(10, 10);
        for i in 0..10 {
            for j in 0..10 {
                raster.set(i, j, (i * 10 + j) as f64).unwrap();
            }
        }
        raster.set(0, 0, f64::NAN).unwrap();

        let stats = raster.statistics();
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.max, Some(99.0));
        assert_eq!(stats.valid_count, 99);
        assert_eq!(stats.nodata_count, 1);
    }

    #[test]
    fn test_grid_mismatch() {
        let a = grid(1.0);
        let mut b = grid(2.0);
        assert!(a.ensure_same_grid(&b).is_ok());

        b.set_transform(GeoTransform::new(0.0, 40.0, 20.0, -20.0));
        let err = a.ensure_same_grid(&b).unwrap_err();
        assert!(matches!(err, Error::GridMismatch { .. }));

        let c: Raster<f64> = Raster::new(3, 4);
        assert!(!a.same_grid(&c));
    }

    #[test]
    fn test_mask_with() {
        let layer = grid(0.7);
        let mut mask: Raster<u8> = Raster::filled(4, 4, 1);
        mask.set_transform(*layer.transform());
        mask.set(1, 1, 0).unwrap();

        let masked = layer.mask_with(&mask).unwrap();
        assert!(!masked.is_valid_at(1, 1).unwrap());
        assert_eq!(masked.valid_count(), 15);
        // input untouched
        assert_eq!(layer.valid_count(), 16);
    }

    #[test]
    fn test_fill_nodata() {
        let mut layer = grid(2.0);
        layer.set(3, 3, f64::NAN).unwrap();
        let filled = layer.fill_nodata(0.0);
        assert_eq!(filled.get(3, 3).unwrap(), 0.0);
        assert_eq!(filled.valid_count(), 16);
    }

    #[test]
    fn test_derive_keeps_grid() {
        let layer = grid(1.0);
        let classes: Raster<i32> = layer.derive(vec![1; 16]).unwrap();
        assert!(layer.same_grid(&classes));
        assert_eq!(classes.nodata(), Some(i32::MIN));
    }
}
