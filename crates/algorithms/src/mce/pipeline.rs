//! Multi-criteria pipeline execution

use std::collections::HashMap;

use postfire_core::raster::{Raster, Region};
use postfire_core::{Error, Result, StageContext};
use tracing::{debug, info, warn};

use super::config::{CriterionConfig, PipelineConfig};
use crate::normalize::normalize;
use crate::overlay::{weighted_overlay, WeightVector};
use crate::statistics::{area_in_ranges, min_max, rescale_percent, RangeArea};

/// Everything one pipeline run produces
#[derive(Debug, Clone)]
pub struct MceOutput {
    /// Weighted composite of the prepared criteria
    pub composite: Raster<f64>,
    /// Composite rescaled to `[0, 100]` with the region min/max
    pub normalized: Raster<f64>,
    pub min: f64,
    pub max: f64,
    /// Area of the composite inside each configured range
    pub areas: Vec<RangeArea>,
}

/// A validated [`PipelineConfig`] ready to run
#[derive(Debug, Clone)]
pub struct McePipeline {
    config: PipelineConfig,
    weights: WeightVector,
}

impl McePipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate().stage(&config.name, "configure", None)?;
        let weights = config.weights().stage(&config.name, "configure", None)?;
        Ok(Self { config, weights })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn weights(&self) -> &WeightVector {
        &self.weights
    }

    /// Criteria with a positive weight; only these need an input layer
    pub fn required_inputs(&self) -> impl Iterator<Item = &str> {
        self.active().map(|c| c.name.as_str())
    }

    fn active(&self) -> impl Iterator<Item = &CriterionConfig> {
        self.config.criteria.iter().filter(|c| c.weight > 0.0)
    }

    /// Valid range, no-data fill and normalization of one criterion layer
    pub fn prepare(&self, criterion: &CriterionConfig, layer: &Raster<f64>) -> Result<Raster<f64>> {
        let name = self.name();
        let c = Some(criterion.name.as_str());

        let mut prepared = match criterion.valid_range {
            Some(range) => range.apply(layer).stage(name, "valid-range", c)?,
            None => layer.clone(),
        };
        if let Some(fill) = criterion.fill_nodata {
            prepared = prepared.fill_nodata(fill);
        }

        let Some(spec) = &criterion.normalization else {
            return Ok(prepared);
        };
        let normalized = normalize(&prepared, spec).stage(name, "normalize", c)?;

        if spec.is_unit_interval() {
            let stats = normalized.statistics();
            if let (Some(lo), Some(hi)) = (stats.min, stats.max) {
                if lo < 0.0 || hi > 1.0 {
                    warn!(
                        pipeline = name,
                        criterion = %criterion.name,
                        min = lo,
                        max = hi,
                        "normalized values outside [0, 1]"
                    );
                }
            }
        }
        debug!(pipeline = name, criterion = %criterion.name, kind = spec.kind(), "criterion normalized");
        Ok(normalized)
    }

    /// Prepare every weighted criterion and combine them.
    ///
    /// `inputs` maps criterion names to raw layers, all on one grid. Every
    /// layer is checked against the first one before any is prepared.
    pub fn composite(&self, inputs: &HashMap<String, Raster<f64>>) -> Result<Raster<f64>> {
        let name = self.name();
        let mut layers: Vec<(&CriterionConfig, &Raster<f64>)> = Vec::new();
        for criterion in self.active() {
            let layer = inputs
                .get(&criterion.name)
                .ok_or_else(|| Error::MissingCriterion(criterion.name.clone()))
                .stage(name, "inputs", Some(&criterion.name))?;
            if let Some(&(_, first)) = layers.first() {
                first.ensure_same_grid(layer).stage(name, "inputs", Some(&criterion.name))?;
            }
            layers.push((criterion, layer));
        }

        let mut prepared = Vec::with_capacity(layers.len());
        for (criterion, layer) in layers {
            prepared.push((self.prepare(criterion, layer)?, criterion.weight));
        }

        let pairs: Vec<(&Raster<f64>, f64)> = prepared.iter().map(|(r, w)| (r, *w)).collect();
        let composite = weighted_overlay(&pairs).stage(name, "overlay", None)?;
        debug!(pipeline = name, criteria = pairs.len(), valid = composite.valid_count(), "composite built");
        Ok(composite)
    }

    /// Composite, its min/max over `region`, the `[0, 100]` rescale and
    /// the configured range areas
    pub fn run(&self, inputs: &HashMap<String, Raster<f64>>, region: &Region, resolution: f64) -> Result<MceOutput> {
        let name = self.name();
        let composite = self.composite(inputs)?;

        let (min, max) = min_max(&composite, region, resolution).stage(name, "min-max", None)?;
        let normalized = rescale_percent(&composite, min, max).stage(name, "min-max", None)?;
        let areas = area_in_ranges(&composite, region, resolution, &self.config.ranges)
            .stage(name, "range-areas", None)?;

        info!(pipeline = name, min, max, ranges = areas.len(), "pipeline finished");
        Ok(MceOutput { composite, normalized, min, max, areas })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mce::ValidRange;
    use crate::normalize::NormalizationSpec;
    use crate::statistics::AreaRange;
    use approx::assert_relative_eq;
    use postfire_core::{ErrorKind, GeoTransform};

    fn layer(values: Vec<f64>) -> Raster<f64> {
        let mut r = Raster::from_vec(values, 2, 2).unwrap();
        r.set_transform(GeoTransform::new(0.0, 20.0, 10.0, -10.0));
        r
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            name: "test".into(),
            criteria: vec![
                CriterionConfig::new("slope", 3.0).normalized(NormalizationSpec::unit_scale(0.0, 40.0).unwrap()),
                CriterionConfig::new("k", 1.0)
                    .normalized(NormalizationSpec::unit_scale(0.0, 0.5).unwrap())
                    .valid_range(ValidRange::below(1.0)),
                CriterionConfig::new("unused", 0.0),
            ],
            ranges: vec![AreaRange::new(-1.0, 0.5, "low"), AreaRange::new(0.5, 2.0, "high")],
        }
    }

    fn inputs() -> HashMap<String, Raster<f64>> {
        HashMap::from([
            ("slope".to_string(), layer(vec![0.0, 20.0, 40.0, 10.0])),
            ("k".to_string(), layer(vec![0.0, 0.25, 0.5, 7.0])),
        ])
    }

    #[test]
    fn test_run() {
        let pipeline = McePipeline::new(config()).unwrap();
        let out = pipeline.run(&inputs(), &Region::Full, 10.0).unwrap();

        assert_relative_eq!(out.composite.get(0, 0).unwrap(), 0.0);
        assert_relative_eq!(out.composite.get(0, 1).unwrap(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(out.composite.get(1, 0).unwrap(), 1.0, epsilon = 1e-12);
        // k = 7 is outside its valid range
        assert!(out.composite.get(1, 1).unwrap().is_nan());

        assert_eq!((out.min, out.max), (0.0, 1.0));
        assert_relative_eq!(out.normalized.get(0, 1).unwrap(), 50.0, epsilon = 1e-9);
        assert_eq!(out.areas[0].area_m2, 100.0);
        assert_eq!(out.areas[1].area_m2, 100.0);
    }

    #[test]
    fn test_zero_weight_needs_no_input() {
        let pipeline = McePipeline::new(config()).unwrap();
        let required: Vec<_> = pipeline.required_inputs().collect();
        assert_eq!(required, vec!["slope", "k"]);
    }

    #[test]
    fn test_missing_input_names_criterion() {
        let pipeline = McePipeline::new(config()).unwrap();
        let mut inputs = inputs();
        inputs.remove("k");

        let err = pipeline.composite(&inputs).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(matches!(err.root(), Error::MissingCriterion(c) if c == "k"));
        assert!(err.to_string().starts_with("test/inputs [k]"));
    }

    #[test]
    fn test_grid_mismatch_names_criterion() {
        let pipeline = McePipeline::new(config()).unwrap();
        let mut inputs = inputs();
        let mut k = layer(vec![0.1; 4]);
        k.set_transform(GeoTransform::new(0.0, 20.0, 5.0, -5.0));
        inputs.insert("k".into(), k);

        let err = pipeline.composite(&inputs).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(matches!(err.root(), Error::GridMismatch { .. }));
        assert!(matches!(err, Error::Stage { stage: "inputs", .. }));
        assert!(err.to_string().starts_with("test/inputs [k]"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = config();
        config.criteria[0].weight = -1.0;
        let err = McePipeline::new(config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_uniform_composite_is_degenerate() {
        let pipeline = McePipeline::new(config()).unwrap();
        let inputs = HashMap::from([
            ("slope".to_string(), layer(vec![20.0; 4])),
            ("k".to_string(), layer(vec![0.25; 4])),
        ]);
        let err = pipeline.run(&inputs, &Region::Full, 10.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Domain);
        assert!(matches!(err, Error::Stage { stage: "min-max", .. }));
    }
}
