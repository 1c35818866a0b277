//! Threshold classification
//!
//! Discretizes a continuous layer into ordinal classes:
//! - **ladder**: ascending boundaries, `K` boundaries give `K + 1` classes
//! - **severity**: the dNBR burn severity ladder and its labels

mod ladder;
mod severity;

pub use ladder::ThresholdLadder;
pub use severity::{
    burn_severity, burn_severity_ladder, SeverityOutput, SeverityParams, BURN_SEVERITY_BOUNDARIES,
    BURN_SEVERITY_LABELS, DNBR_SCALE,
};

use crate::maybe_rayon::collect_rows;
use postfire_core::raster::Raster;
use postfire_core::{Algorithm, Error, Result};

/// No-data value of class rasters
pub const CLASS_NODATA: i32 = i32::MIN;

/// Classification as an [`Algorithm`]; defaults to the burn severity ladder
#[derive(Debug, Clone, Default)]
pub struct Classify;

impl Default for ThresholdLadder {
    fn default() -> Self {
        burn_severity_ladder()
    }
}

impl Algorithm for Classify {
    type Input = Raster<f64>;
    type Output = Raster<i32>;
    type Params = ThresholdLadder;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Classify"
    }

    fn description(&self) -> &'static str {
        "Assign ordinal classes from an ascending threshold ladder"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        classify(&input, &params)
    }
}

/// Classify every valid cell of `layer`.
///
/// Class `c` is the number of boundaries the value meets or exceeds.
/// Invalid cells become [`CLASS_NODATA`] and stay out of every statistic
/// computed from the class raster.
pub fn classify(layer: &Raster<f64>, ladder: &ThresholdLadder) -> Result<Raster<i32>> {
    let (rows, _) = layer.shape();
    let data = layer.data();

    let out: Vec<i32> = collect_rows(rows, |row| {
        data.row(row)
            .iter()
            .map(|&v| {
                if layer.is_nodata(v) {
                    CLASS_NODATA
                } else {
                    ladder.class_of(v) as i32
                }
            })
            .collect()
    });

    // derived i32 rasters carry CLASS_NODATA
    layer.derive(out)
}
