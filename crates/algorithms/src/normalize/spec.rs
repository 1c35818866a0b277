//! Normalization configuration

use serde::{Deserialize, Serialize};
use postfire_core::{Error, Result};

use super::rules::ReclassRules;

/// How a raw criterion layer is mapped onto a comparable scale.
///
/// Serialized with a `kind` tag, e.g.
/// `{"kind": "unit-scale", "min": 5.0, "max": 38.0}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NormalizationSpec {
    /// `(v - min) / (max - min)`, not clamped
    UnitScale { min: f64, max: f64 },
    /// `(cap - min(v, cap)) / cap`
    CappedInvertScale { cap: f64 },
    /// Ordered first-match rules
    ExpressionReclassify { rules: ReclassRules },
}

impl Default for NormalizationSpec {
    fn default() -> Self {
        NormalizationSpec::UnitScale { min: 0.0, max: 1.0 }
    }
}

impl NormalizationSpec {
    pub fn unit_scale(min: f64, max: f64) -> Result<Self> {
        let spec = NormalizationSpec::UnitScale { min, max };
        spec.validate()?;
        Ok(spec)
    }

    pub fn capped_invert(cap: f64) -> Result<Self> {
        let spec = NormalizationSpec::CappedInvertScale { cap };
        spec.validate()?;
        Ok(spec)
    }

    pub fn reclassify(rules: ReclassRules) -> Self {
        NormalizationSpec::ExpressionReclassify { rules }
    }

    /// Short name used in logs and errors
    pub fn kind(&self) -> &'static str {
        match self {
            NormalizationSpec::UnitScale { .. } => "unit-scale",
            NormalizationSpec::CappedInvertScale { .. } => "capped-invert-scale",
            NormalizationSpec::ExpressionReclassify { .. } => "expression-reclassify",
        }
    }

    /// Whether outputs are expected in `[0, 1]` (continuous scalings only)
    pub fn is_unit_interval(&self) -> bool {
        !matches!(self, NormalizationSpec::ExpressionReclassify { .. })
    }

    /// Check parameters. Zero-width scales are domain errors; non-finite or
    /// negative parameters are configuration errors.
    pub fn validate(&self) -> Result<()> {
        match *self {
            NormalizationSpec::UnitScale { min, max } => {
                if !min.is_finite() || !max.is_finite() {
                    return Err(Error::invalid_parameter(
                        "unit_scale",
                        format!("[{min}, {max}]"),
                        "bounds must be finite",
                    ));
                }
                if max == min {
                    return Err(Error::DegenerateScale { what: "unit scale", value: min });
                }
                Ok(())
            }
            NormalizationSpec::CappedInvertScale { cap } => {
                if !cap.is_finite() || cap < 0.0 {
                    return Err(Error::invalid_parameter("cap", cap, "must be finite and non-negative"));
                }
                if cap == 0.0 {
                    return Err(Error::DegenerateScale { what: "capped invert scale", value: cap });
                }
                Ok(())
            }
            // rule sets are validated when they are built
            NormalizationSpec::ExpressionReclassify { .. } => Ok(()),
        }
    }

    /// Apply to a single valid value. Call [`validate`](Self::validate) first.
    pub fn apply(&self, v: f64) -> f64 {
        match self {
            NormalizationSpec::UnitScale { min, max } => (v - min) / (max - min),
            NormalizationSpec::CappedInvertScale { cap } => (cap - v.min(*cap)) / cap,
            NormalizationSpec::ExpressionReclassify { rules } => rules.apply(v),
        }
    }

    /// Recover the raw value from a unit-scaled one. `None` for the other
    /// kinds, which are not invertible.
    pub fn invert(&self, scaled: f64) -> Option<f64> {
        match *self {
            NormalizationSpec::UnitScale { min, max } => Some(min + scaled * (max - min)),
            _ => None,
        }
    }
}
