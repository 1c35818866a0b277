//! Weighted-sum overlay
//!
//! Combines normalized criterion layers into one composite:
//!
//! ```text
//! composite = sum(w_i * x_i) / sum(w_i)
//! ```
//!
//! A cell is defined only where every criterion is defined.

mod weights;

pub use weights::{Weight, WeightVector};

use crate::maybe_rayon::collect_rows;
use postfire_core::raster::Raster;
use postfire_core::{Algorithm, Error, Result};

/// Weighted overlay as an [`Algorithm`]; the input pairs each layer with its weight.
#[derive(Debug, Clone, Default)]
pub struct WeightedOverlay;

impl Algorithm for WeightedOverlay {
    type Input = Vec<(Raster<f64>, f64)>;
    type Output = Raster<f64>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Weighted Overlay"
    }

    fn description(&self) -> &'static str {
        "Weighted sum of criterion layers divided by the total weight"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        let pairs: Vec<(&Raster<f64>, f64)> = input.iter().map(|(r, w)| (r, *w)).collect();
        weighted_overlay(&pairs)
    }
}

/// Combine `(layer, weight)` pairs cell by cell.
///
/// All layers must share one grid ([`Error::GridMismatch`] otherwise; no
/// partial result is produced). Weights must be finite and non-negative
/// with a positive sum. They are not rescaled before combining; the sum is
/// divided by the total weight afterwards.
///
/// # Example
/// ```ignore
/// let risk = weighted_overlay(&[(&slope_n, 0.408), (&k_n, 0.267), (&bsi_n, 0.164)])?;
/// ```
pub fn weighted_overlay(inputs: &[(&Raster<f64>, f64)]) -> Result<Raster<f64>> {
    let Some(&(first, _)) = inputs.first() else {
        return Err(Error::InvalidWeights("no layers to combine".into()));
    };
    for &(layer, weight) in inputs {
        if !weight.is_finite() || weight < 0.0 {
            return Err(Error::InvalidWeights(format!(
                "weight {weight} must be finite and non-negative"
            )));
        }
        first.ensure_same_grid(layer)?;
    }
    let total: f64 = inputs.iter().map(|&(_, w)| w).sum();
    if total <= 0.0 {
        return Err(Error::InvalidWeights("weights sum to zero".into()));
    }

    let (rows, cols) = first.shape();
    let out = collect_rows(rows, |row| {
        let rows_in: Vec<_> = inputs.iter().map(|&(layer, w)| (layer, layer.data().row(row), w)).collect();
        (0..cols)
            .map(|col| {
                let mut acc = 0.0;
                for (layer, values, w) in &rows_in {
                    let v = values[col];
                    if layer.is_nodata(v) {
                        return f64::NAN;
                    }
                    acc += w * v;
                }
                acc / total
            })
            .collect()
    });

    first.derive(out)
}
