//! # postfire algorithms
//!
//! The raster engine behind post-fire decision-support maps.
//!
//! ## Modules
//!
//! - **normalize**: unit-scale, capped-invert and rule-based reclassification
//! - **overlay**: weight vectors and the renormalized weighted-sum overlay
//! - **classification**: threshold ladders, ordinal classification, burn severity
//! - **statistics**: per-class pixel/area tables, min/max rescaling, range areas
//! - **mce**: configurable multi-criteria pipelines (soil erosion risk,
//!   vegetation recovery)

mod maybe_rayon;

pub mod classification;
pub mod mce;
pub mod normalize;
pub mod overlay;
pub mod statistics;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classification::{
        burn_severity, classify, Classify, SeverityOutput, SeverityParams, ThresholdLadder,
    };
    pub use crate::mce::{presets, CriterionConfig, McePipeline, MceOutput, PipelineConfig, ValidRange};
    pub use crate::normalize::{
        normalize, NormalizationSpec, Normalize, Outcome, Predicate, ReclassRule, ReclassRules,
    };
    pub use crate::overlay::{weighted_overlay, Weight, WeightVector, WeightedOverlay};
    pub use crate::statistics::{
        area_in_ranges, class_statistics, min_max, rescale_percent, AreaRange, CellAreaModel,
        ClassRecord, ClassStatistics, RangeArea,
    };
    pub use postfire_core::prelude::*;
}
