//! Multi-criteria evaluation
//!
//! A pipeline prepares each weighted criterion (valid range, no-data fill,
//! normalization), combines them with the weighted overlay, then reports
//! the composite's min/max, its `[0, 100]` rescale and range areas.
//!
//! Every failure is wrapped in [`Error::Stage`](postfire_core::Error::Stage)
//! naming the pipeline, stage and criterion.

mod config;
mod pipeline;
pub mod presets;

pub use config::{CriterionConfig, PipelineConfig, ValidRange};
pub use pipeline::{McePipeline, MceOutput};
