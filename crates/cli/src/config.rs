//! Analysis files for `postfire run`
//!
//! ```json
//! {
//!   "sampling_resolution": 10.0,
//!   "region": {"bounds": [440000, 4300000, 450000, 4310000]},
//!   "severity": {"dnbr": "dnbr.tif"},
//!   "pipelines": [
//!     {"preset": "soil-erosion", "inputs": {"slope": "slope.tif", ...}, "weights": {"slope": 0.5}}
//!   ]
//! }
//! ```
//!
//! Relative paths are resolved against the analysis file's directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use postfire_algorithms::classification::{ThresholdLadder, DNBR_SCALE};
use postfire_algorithms::mce::{presets, PipelineConfig};
use postfire_algorithms::statistics::{ClassStatistics, RangeArea, AreaRange};

/// Area of interest as written in an analysis file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionSpec {
    #[default]
    Full,
    /// `[min_x, min_y, max_x, max_y]`
    Bounds([f64; 4]),
    /// Raster on the input grid, non-zero inside
    Mask(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityRun {
    pub dnbr: PathBuf,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ladder: Option<ThresholdLadder>,
    /// Sampling resolution of the class table; the analysis default otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<f64>,
}

fn default_scale() -> f64 {
    DNBR_SCALE
}

/// One pipeline: a preset with optional overrides, or a full configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<PipelineConfig>,
    /// Criterion name to raster path
    pub inputs: BTreeMap<String, PathBuf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub weights: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranges: Option<Vec<AreaRange>>,
}

impl PipelineRun {
    /// Pipeline configuration with weight and range overrides applied
    pub fn resolve(&self) -> Result<PipelineConfig> {
        let mut config = match (&self.preset, &self.config) {
            (Some(name), None) => presets::preset(name)?,
            (None, Some(config)) => config.clone(),
            (Some(_), Some(_)) => bail!("a pipeline takes either 'preset' or 'config', not both"),
            (None, None) => bail!("a pipeline needs 'preset' or 'config'"),
        };
        for (name, &weight) in &self.weights {
            config
                .set_weight(name, weight)
                .with_context(|| format!("overriding weights of '{}'", config.name))?;
        }
        if let Some(ranges) = &self.ranges {
            config.ranges = ranges.clone();
        }
        config.validate().with_context(|| format!("pipeline '{}'", config.name))?;
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Sampling resolution in layer units; the input cell size when absent
    #[serde(default)]
    pub sampling_resolution: Option<f64>,
    #[serde(default)]
    pub region: RegionSpec,
    #[serde(default)]
    pub severity: Option<SeverityRun>,
    #[serde(default)]
    pub pipelines: Vec<PipelineRun>,
}

impl AnalysisConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_json::from_str(text).context("invalid analysis file")?;
        if config.severity.is_none() && config.pipelines.is_empty() {
            bail!("analysis file configures no severity run and no pipelines");
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let mut config = Self::from_json(&text).with_context(|| format!("in {}", path.display()))?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    /// Make relative paths relative to `base`
    fn rebase(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let RegionSpec::Mask(path) = &mut self.region {
            join(path);
        }
        if let Some(severity) = &mut self.severity {
            join(&mut severity.dnbr);
        }
        for pipeline in &mut self.pipelines {
            pipeline.inputs.values_mut().for_each(join);
        }
        if let Some(out) = &mut self.output_dir {
            join(out);
        }
    }
}

/// Written as `report.json` next to the output rasters
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<ClassStatistics>,
    pub pipelines: Vec<PipelineReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub areas: Vec<RangeArea>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANALYSIS: &str = r#"{
        "sampling_resolution": 10.0,
        "region": {"bounds": [0, 0, 100, 100]},
        "severity": {"dnbr": "dnbr.tif"},
        "pipelines": [
            {
                "preset": "soil-erosion",
                "inputs": {"slope": "slope.tif", "bare_soil": "/data/bsi.tif"},
                "weights": {"slope": 0.5}
            }
        ]
    }"#;

    #[test]
    fn test_parse_and_override() {
        let config = AnalysisConfig::from_json(ANALYSIS).unwrap();
        assert_eq!(config.region, RegionSpec::Bounds([0.0, 0.0, 100.0, 100.0]));
        assert_eq!(config.severity.as_ref().unwrap().scale, 1000.0);

        let pipeline = config.pipelines[0].resolve().unwrap();
        assert_eq!(pipeline.criterion("slope").unwrap().weight, 0.5);
        assert_eq!(pipeline.criterion("bare_soil").unwrap().weight, 0.164);
    }

    #[test]
    fn test_rebase_relative_paths() {
        let mut config = AnalysisConfig::from_json(ANALYSIS).unwrap();
        config.rebase(Path::new("/work"));
        let inputs = &config.pipelines[0].inputs;
        assert_eq!(inputs["slope"], PathBuf::from("/work/slope.tif"));
        assert_eq!(inputs["bare_soil"], PathBuf::from("/data/bsi.tif"));
        assert_eq!(config.severity.unwrap().dnbr, PathBuf::from("/work/dnbr.tif"));
    }

    #[test]
    fn test_unknown_weight_override() {
        let run = PipelineRun {
            preset: Some("vegetation-recovery".into()),
            config: None,
            inputs: BTreeMap::new(),
            weights: BTreeMap::from([("slope".to_string(), 1.0)]),
            ranges: None,
        };
        assert!(run.resolve().is_err());
    }

    #[test]
    fn test_preset_or_config_required() {
        let run = PipelineRun {
            preset: None,
            config: None,
            inputs: BTreeMap::new(),
            weights: BTreeMap::new(),
            ranges: None,
        };
        assert!(run.resolve().is_err());
    }

    #[test]
    fn test_empty_analysis_rejected() {
        assert!(AnalysisConfig::from_json("{}").is_err());
    }
}
