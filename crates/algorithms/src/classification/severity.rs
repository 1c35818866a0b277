//! Burn severity from dNBR
//!
//! dNBR (pre-fire NBR minus post-fire NBR) is scaled by 1000 and sorted
//! into the USGS severity classes.

use serde::{Deserialize, Serialize};
use postfire_core::raster::Raster;
use postfire_core::{Error, Result};
use tracing::debug;

use super::{classify, ThresholdLadder};
use crate::normalize::map_valid;

/// Scale factor applied to dNBR before classification
pub const DNBR_SCALE: f64 = 1000.0;

/// Class boundaries in scaled dNBR units
pub const BURN_SEVERITY_BOUNDARIES: [f64; 8] = [-1000.0, -251.0, -101.0, 99.0, 269.0, 439.0, 659.0, 2000.0];

pub const BURN_SEVERITY_LABELS: [&str; 9] = [
    "NA (below range)",
    "Enhanced Regrowth High",
    "Enhanced Regrowth Low",
    "Unburned",
    "Low Severity",
    "Moderate-low Severity",
    "Moderate-high Severity",
    "High Severity",
    "NA (above range)",
];

/// The labelled 9-class burn severity ladder
pub fn burn_severity_ladder() -> ThresholdLadder {
    ThresholdLadder::from_static(&BURN_SEVERITY_BOUNDARIES, &BURN_SEVERITY_LABELS)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityParams {
    /// Multiplier applied to dNBR (1000 for the standard ladder)
    pub scale: f64,
    pub ladder: ThresholdLadder,
}

impl Default for SeverityParams {
    fn default() -> Self {
        Self { scale: DNBR_SCALE, ladder: burn_severity_ladder() }
    }
}

/// Scaled dNBR and its class raster
#[derive(Debug, Clone)]
pub struct SeverityOutput {
    pub scaled: Raster<f64>,
    pub classes: Raster<i32>,
}

/// Scale `dnbr` and classify it into burn severity classes
pub fn burn_severity(dnbr: &Raster<f64>, params: &SeverityParams) -> Result<SeverityOutput> {
    if !params.scale.is_finite() || params.scale == 0.0 {
        return Err(Error::invalid_parameter("scale", params.scale, "must be finite and non-zero"));
    }
    let scale = params.scale;
    let scaled = map_valid(dnbr, |v| v * scale)?;
    let classes = classify(&scaled, &params.ladder)?;
    debug!(
        valid = classes.valid_count(),
        classes = params.ladder.class_count(),
        "burn severity classified"
    );
    Ok(SeverityOutput { scaled, classes })
}
