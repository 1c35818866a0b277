//! Pipeline configuration

use serde::{Deserialize, Serialize};
use postfire_core::raster::Raster;
use postfire_core::{Error, Result};

use crate::normalize::{map_valid, NormalizationSpec};
use crate::overlay::{Weight, WeightVector};
use crate::statistics::AreaRange;

/// Half-open validity window `[min, max)`; cells outside become invalid
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl ValidRange {
    /// Only values strictly below `max` are valid
    pub fn below(max: f64) -> Self {
        Self { min: None, max: Some(max) }
    }

    pub fn contains(&self, v: f64) -> bool {
        self.min.is_none_or(|min| v >= min) && self.max.is_none_or(|max| v < max)
    }

    /// Copy of `layer` with out-of-range cells invalidated
    pub fn apply(&self, layer: &Raster<f64>) -> Result<Raster<f64>> {
        map_valid(layer, |v| if self.contains(v) { v } else { f64::NAN })
    }
}

/// One criterion of a pipeline.
///
/// Preparation order: valid range, then no-data fill, then normalization.
/// Without a normalization the values are used as they are (layers that
/// already hold ordinal scores).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionConfig {
    pub name: String,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalization: Option<NormalizationSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_range: Option<ValidRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_nodata: Option<f64>,
}

impl CriterionConfig {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
            normalization: None,
            valid_range: None,
            fill_nodata: None,
        }
    }

    pub fn normalized(mut self, spec: NormalizationSpec) -> Self {
        self.normalization = Some(spec);
        self
    }

    pub fn valid_range(mut self, range: ValidRange) -> Self {
        self.valid_range = Some(range);
        self
    }

    pub fn fill_nodata(mut self, value: f64) -> Self {
        self.fill_nodata = Some(value);
        self
    }

    fn validate(&self) -> Result<()> {
        if let Some(spec) = &self.normalization {
            spec.validate()?;
        }
        if let Some(range) = self.valid_range {
            if let (Some(min), Some(max)) = (range.min, range.max) {
                if !(min < max) {
                    return Err(Error::invalid_parameter(
                        "valid_range",
                        format!("[{min}, {max})"),
                        "min must be below max",
                    ));
                }
            }
        }
        if let Some(fill) = self.fill_nodata {
            if !fill.is_finite() {
                return Err(Error::invalid_parameter("fill_nodata", fill, "must be finite"));
            }
        }
        Ok(())
    }
}

/// A named multi-criteria pipeline: criteria with weights, plus the ranges
/// its composite is reported over
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPipelineConfig")]
pub struct PipelineConfig {
    pub name: String,
    pub criteria: Vec<CriterionConfig>,
    #[serde(default)]
    pub ranges: Vec<AreaRange>,
}

#[derive(Deserialize)]
struct RawPipelineConfig {
    name: String,
    criteria: Vec<CriterionConfig>,
    #[serde(default)]
    ranges: Vec<AreaRange>,
}

impl TryFrom<RawPipelineConfig> for PipelineConfig {
    type Error = Error;

    fn try_from(raw: RawPipelineConfig) -> Result<Self> {
        let config = PipelineConfig { name: raw.name, criteria: raw.criteria, ranges: raw.ranges };
        config.validate()?;
        Ok(config)
    }
}

impl PipelineConfig {
    /// Check the weight vector and every criterion's parameters
    pub fn validate(&self) -> Result<()> {
        self.weights()?;
        for criterion in &self.criteria {
            criterion.validate()?;
        }
        Ok(())
    }

    /// Weights in criterion order
    pub fn weights(&self) -> Result<WeightVector> {
        WeightVector::new(self.criteria.iter().map(|c| Weight::new(c.name.clone(), c.weight)).collect())
    }

    pub fn criterion(&self, name: &str) -> Option<&CriterionConfig> {
        self.criteria.iter().find(|c| c.name == name)
    }

    /// Replace the weight of an existing criterion
    pub fn set_weight(&mut self, name: &str, weight: f64) -> Result<()> {
        let criterion = self
            .criteria
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| Error::MissingCriterion(name.to_string()))?;
        criterion.weight = weight;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_range_half_open() {
        let r = ValidRange::below(1.0);
        assert!(r.contains(0.99));
        assert!(!r.contains(1.0));
        let r = ValidRange { min: Some(0.0), max: None };
        assert!(r.contains(0.0));
        assert!(!r.contains(-0.1));
    }

    #[test]
    fn test_valid_range_apply() {
        let layer = Raster::from_vec(vec![0.2, 1.0, 3.5, f64::NAN], 2, 2).unwrap();
        let out = ValidRange::below(1.0).apply(&layer).unwrap();
        assert_eq!(out.valid_count(), 1);
        assert_eq!(out.get(0, 0).unwrap(), 0.2);
    }

    #[test]
    fn test_deserialize_rejects_bad_weights() {
        let json = r#"{
            "name": "test",
            "criteria": [
                {"name": "a", "weight": 0.0},
                {"name": "b", "weight": 0.0}
            ]
        }"#;
        let err = serde_json::from_str::<PipelineConfig>(json).unwrap_err();
        assert!(err.to_string().contains("zero"));
    }

    #[test]
    fn test_deserialize_rejects_degenerate_scale() {
        let json = r#"{
            "name": "test",
            "criteria": [
                {"name": "slope", "weight": 1.0, "normalization": {"kind": "unit-scale", "min": 5, "max": 5}}
            ]
        }"#;
        assert!(serde_json::from_str::<PipelineConfig>(json).is_err());
    }

    #[test]
    fn test_deserialize_full_criterion() {
        let json = r#"{
            "name": "soil",
            "criteria": [{
                "name": "soil_erodibility",
                "weight": 0.267,
                "normalization": {"kind": "unit-scale", "min": 0.01, "max": 0.55},
                "valid_range": {"max": 1.0}
            }],
            "ranges": [{"lower": 0.1, "upper": 0.3, "label": "low"}]
        }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        let k = config.criterion("soil_erodibility").unwrap();
        assert_eq!(k.valid_range, Some(ValidRange::below(1.0)));
        assert_eq!(config.ranges.len(), 1);
    }

    #[test]
    fn test_set_weight() {
        let mut config = PipelineConfig {
            name: "p".into(),
            criteria: vec![CriterionConfig::new("a", 1.0)],
            ranges: vec![],
        };
        config.set_weight("a", 2.0).unwrap();
        assert_eq!(config.criteria[0].weight, 2.0);
        assert!(matches!(config.set_weight("z", 1.0), Err(Error::MissingCriterion(_))));
    }
}
