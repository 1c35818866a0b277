//! Threshold ladders

use serde::{Deserialize, Serialize};
use postfire_core::{Error, Result};

/// Strictly ascending class boundaries.
///
/// `K` boundaries define `K + 1` ordinal classes. The class of a value is
/// the number of boundaries it meets or exceeds, so a value equal to a
/// boundary already belongs to the class above it.
///
/// Deserializes either from a plain array of boundaries or from
/// `{"boundaries": [...], "labels": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LadderRepr", into = "LadderRepr")]
pub struct ThresholdLadder {
    boundaries: Vec<f64>,
    labels: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum LadderRepr {
    Plain(Vec<f64>),
    Labelled {
        boundaries: Vec<f64>,
        labels: Vec<String>,
    },
}

impl ThresholdLadder {
    pub fn new(boundaries: Vec<f64>) -> Result<Self> {
        if boundaries.is_empty() {
            return Err(Error::invalid_parameter("ladder", "[]", "needs at least one boundary"));
        }
        if boundaries.iter().any(|b| !b.is_finite()) {
            return Err(Error::invalid_parameter("ladder", format!("{boundaries:?}"), "boundaries must be finite"));
        }
        if boundaries.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::invalid_parameter(
                "ladder",
                format!("{boundaries:?}"),
                "boundaries must be strictly ascending",
            ));
        }
        Ok(Self { boundaries, labels: None })
    }

    /// Attach one label per class (`boundaries + 1` labels)
    pub fn with_labels<S: Into<String>>(mut self, labels: impl IntoIterator<Item = S>) -> Result<Self> {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.len() != self.class_count() {
            return Err(Error::invalid_parameter(
                "labels",
                labels.len(),
                format!("expected {} labels for {} boundaries", self.class_count(), self.boundaries.len()),
            ));
        }
        self.labels = Some(labels);
        Ok(self)
    }

    /// Ladder from constant boundaries and labels known to be valid
    pub(super) fn from_static(boundaries: &[f64], labels: &[&str]) -> Self {
        debug_assert!(boundaries.windows(2).all(|w| w[0] < w[1]));
        debug_assert_eq!(labels.len(), boundaries.len() + 1);
        Self {
            boundaries: boundaries.to_vec(),
            labels: Some(labels.iter().map(|l| l.to_string()).collect()),
        }
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    /// Number of classes, one more than the number of boundaries
    pub fn class_count(&self) -> usize {
        self.boundaries.len() + 1
    }

    /// Smallest `c` with `v < boundaries[c]`, or `boundaries.len()` when `v`
    /// meets the last boundary.
    pub fn class_of(&self, v: f64) -> usize {
        self.boundaries.partition_point(|&b| b <= v)
    }

    /// Label of class `c`; `"class c"` when no labels are attached
    pub fn label(&self, class: usize) -> String {
        self.labels
            .as_ref()
            .and_then(|l| l.get(class).cloned())
            .unwrap_or_else(|| format!("class {class}"))
    }
}

impl TryFrom<LadderRepr> for ThresholdLadder {
    type Error = Error;

    fn try_from(repr: LadderRepr) -> Result<Self> {
        match repr {
            LadderRepr::Plain(boundaries) => Self::new(boundaries),
            LadderRepr::Labelled { boundaries, labels } => Self::new(boundaries)?.with_labels(labels),
        }
    }
}

impl From<ThresholdLadder> for LadderRepr {
    fn from(ladder: ThresholdLadder) -> Self {
        match ladder.labels {
            Some(labels) => LadderRepr::Labelled { boundaries: ladder.boundaries, labels },
            None => LadderRepr::Plain(ladder.boundaries),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn severity() -> ThresholdLadder {
        ThresholdLadder::new(vec![-1000.0, -251.0, -101.0, 99.0, 269.0, 439.0, 659.0, 2000.0]).unwrap()
    }

    #[test]
    fn test_boundary_value_moves_up() {
        let ladder = severity();
        assert_eq!(ladder.class_of(99.0), 4);
        assert_eq!(ladder.class_of(98.999), 3);
        assert_eq!(ladder.class_of(-1000.0), 1);
    }

    #[test]
    fn test_extremes() {
        let ladder = severity();
        assert_eq!(ladder.class_of(-5000.0), 0);
        assert_eq!(ladder.class_of(2000.0), 8);
        assert_eq!(ladder.class_of(1e9), 8);
        assert_eq!(ladder.class_count(), 9);
    }

    #[test]
    fn test_monotonic() {
        let ladder = severity();
        let mut prev = 0;
        for i in -3000..3000 {
            let c = ladder.class_of(i as f64 * 0.9);
            assert!(c >= prev);
            prev = c;
        }
    }

    #[test]
    fn test_rejects_unsorted() {
        assert!(ThresholdLadder::new(vec![0.3, 0.3]).is_err());
        assert!(ThresholdLadder::new(vec![0.6, 0.3]).is_err());
        assert!(ThresholdLadder::new(vec![]).is_err());
        assert!(ThresholdLadder::new(vec![f64::NAN]).is_err());
    }

    #[test]
    fn test_labels() {
        let ladder = ThresholdLadder::new(vec![0.3, 0.6])
            .unwrap()
            .with_labels(["low", "medium", "high"])
            .unwrap();
        assert_eq!(ladder.label(1), "medium");
        assert!(ThresholdLadder::new(vec![0.3]).unwrap().with_labels(["only"]).is_err());
        assert_eq!(ThresholdLadder::new(vec![0.3]).unwrap().label(1), "class 1");
    }

    #[test]
    fn test_deserialize_both_forms() {
        let plain: ThresholdLadder = serde_json::from_str("[0.3, 0.6]").unwrap();
        assert_eq!(plain.class_count(), 3);

        let labelled: ThresholdLadder =
            serde_json::from_str(r#"{"boundaries": [0.5], "labels": ["dry", "humid"]}"#).unwrap();
        assert_eq!(labelled.label(0), "dry");

        assert!(serde_json::from_str::<ThresholdLadder>("[0.6, 0.3]").is_err());
    }
}
