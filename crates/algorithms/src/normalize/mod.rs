//! Criterion normalization
//!
//! Maps a raw criterion layer onto a comparable scale:
//! - **unit-scale**: linear `(v - min) / (max - min)`, unclamped
//! - **capped-invert-scale**: `(cap - min(v, cap)) / cap`
//! - **expression-reclassify**: ordered rules to small ordinal scores

mod rules;
mod spec;

pub use rules::{Outcome, Predicate, ReclassRule, ReclassRules};
pub use spec::NormalizationSpec;

use crate::maybe_rayon::collect_rows;
use postfire_core::raster::Raster;
use postfire_core::{Algorithm, Error, Result};

/// Normalization as an [`Algorithm`]
#[derive(Debug, Clone, Default)]
pub struct Normalize;

impl Algorithm for Normalize {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = NormalizationSpec;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Normalize"
    }

    fn description(&self) -> &'static str {
        "Rescale a criterion layer (unit scale, capped invert or rule reclassification)"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        normalize(&input, &params)
    }
}

/// Apply `f` to every valid cell; invalid cells become NaN.
pub(crate) fn map_valid<F>(raster: &Raster<f64>, f: F) -> Result<Raster<f64>>
where
    F: Fn(f64) -> f64 + Sync + Send,
{
    let (rows, cols) = raster.shape();
    let data = raster.data();

    let out: Vec<f64> = collect_rows(rows, |row| {
        data.row(row)
            .iter()
            .map(|&v| if raster.is_nodata(v) { f64::NAN } else { f(v) })
            .collect()
    });
    debug_assert_eq!(out.len(), rows * cols);

    raster.derive(out)
}

/// Normalize a layer according to `spec`.
///
/// The normalization is validated first, so a zero-width scale fails with
/// [`Error::DegenerateScale`] before any cell is touched.
///
/// # Example
/// ```ignore
/// let slope_norm = normalize(&slope, &NormalizationSpec::unit_scale(5.0, 38.0)?)?;
/// ```
pub fn normalize(layer: &Raster<f64>, spec: &NormalizationSpec) -> Result<Raster<f64>> {
    spec.validate()?;
    map_valid(layer, |v| spec.apply(v))
}
