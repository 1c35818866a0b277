//! Built-in pipelines and their AHP weights

use postfire_core::{Error, Result};

use super::config::{CriterionConfig, PipelineConfig, ValidRange};
use crate::normalize::{NormalizationSpec, Predicate, ReclassRule, ReclassRules};
use crate::statistics::AreaRange;

pub const SOIL_EROSION: &str = "soil-erosion";
pub const VEGETATION_RECOVERY: &str = "vegetation-recovery";

/// Names accepted by [`preset`]
pub const PRESET_NAMES: [&str; 2] = [SOIL_EROSION, VEGETATION_RECOVERY];

/// Look a preset up by name
pub fn preset(name: &str) -> Result<PipelineConfig> {
    match name {
        SOIL_EROSION => Ok(soil_erosion_risk()),
        VEGETATION_RECOVERY => vegetation_recovery(),
        other => Err(Error::invalid_parameter(
            "pipeline",
            other,
            format!("known pipelines: {}", PRESET_NAMES.join(", ")),
        )),
    }
}

fn unit(min: f64, max: f64) -> NormalizationSpec {
    NormalizationSpec::UnitScale { min, max }
}

/// Soil erosion risk.
///
/// Bare soil index, soil erodibility (K factor), resprouter cover (%),
/// slope (degrees) and burn severity (dNBR). Higher is riskier.
pub fn soil_erosion_risk() -> PipelineConfig {
    PipelineConfig {
        name: SOIL_EROSION.to_string(),
        criteria: vec![
            CriterionConfig::new("bare_soil", 0.164).normalized(unit(-1.0, 1.0)),
            CriterionConfig::new("soil_erodibility", 0.267)
                .normalized(unit(0.01, 0.55))
                .valid_range(ValidRange::below(1.0)),
            CriterionConfig::new("resprouter_cover", 0.072)
                .normalized(NormalizationSpec::CappedInvertScale { cap: 40.0 }),
            CriterionConfig::new("slope", 0.408).normalized(unit(5.0, 38.0)),
            CriterionConfig::new("burn_severity", 0.089).normalized(unit(0.1, 0.66)),
        ],
        ranges: vec![
            AreaRange::new(-1.0, 0.1, "very low"),
            AreaRange::new(0.1, 0.3, "low"),
            AreaRange::new(0.3, 0.4, "moderate"),
            AreaRange::new(0.4, 0.6, "high"),
            AreaRange::new(0.6, 1.5, "very high"),
        ],
    }
}

/// Favourability of aspect for regrowth: north-facing best
pub fn aspect_rules() -> Result<ReclassRules> {
    ReclassRules::new(vec![
        ReclassRule::score(Predicate::between(0.0, 90.0), 1.0),
        ReclassRule::score(Predicate::above_up_to(270.0, 360.0), 1.0),
        ReclassRule::score(Predicate::above_up_to(90.0, 135.0), 2.0),
        ReclassRule::score(Predicate::above_up_to(225.0, 270.0), 2.0),
        ReclassRule::score(Predicate::above_up_to(135.0, 225.0), 3.0),
        ReclassRule::score(Predicate::Any, 0.0),
    ])
}

/// Aridity index: drier scores higher
pub fn aridity_rules() -> Result<ReclassRules> {
    ReclassRules::new(vec![
        ReclassRule::score(Predicate::Le(0.2), 3.0),
        ReclassRule::score(Predicate::Le(0.5), 2.0),
        ReclassRule::score(Predicate::Any, 1.0),
    ])
}

/// Burn severity (dNBR) as a 1-3 score
pub fn severity_rules() -> Result<ReclassRules> {
    ReclassRules::new(vec![
        ReclassRule::score(Predicate::Le(0.269), 1.0),
        ReclassRule::score(Predicate::Le(0.439), 2.0),
        ReclassRule::score(Predicate::Any, 3.0),
    ])
}

/// Vegetation recovery difficulty.
///
/// Regeneration strategy and fire recurrence arrive as ordinal scores;
/// aspect, aridity and burn severity are reclassified to 1-3.
pub fn vegetation_recovery() -> Result<PipelineConfig> {
    Ok(PipelineConfig {
        name: VEGETATION_RECOVERY.to_string(),
        criteria: vec![
            CriterionConfig::new("regeneration_strategy", 0.036).fill_nodata(0.0),
            CriterionConfig::new("aspect", 0.102).normalized(NormalizationSpec::reclassify(aspect_rules()?)),
            CriterionConfig::new("aridity", 0.237).normalized(NormalizationSpec::reclassify(aridity_rules()?)),
            CriterionConfig::new("burn_severity", 0.143)
                .normalized(NormalizationSpec::reclassify(severity_rules()?)),
            CriterionConfig::new("fire_recurrence", 0.482),
        ],
        ranges: vec![
            AreaRange::new(-1.0, 1.0, "1"),
            AreaRange::new(1.0, 2.0, "2"),
            AreaRange::new(2.0, 3.5, "3"),
        ],
    })
}
