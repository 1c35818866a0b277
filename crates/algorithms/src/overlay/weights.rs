//! Criterion weight vectors

use serde::{Deserialize, Serialize};
use postfire_core::{Error, Result};

/// Weight of one named criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weight {
    pub criterion: String,
    pub weight: f64,
}

impl Weight {
    pub fn new(criterion: impl Into<String>, weight: f64) -> Self {
        Self { criterion: criterion.into(), weight }
    }
}

/// Ordered criterion weights.
///
/// Invariants, checked on construction: at least one entry, unique names,
/// every weight finite and non-negative, at least one strictly positive.
/// Weights need not sum to 1; the overlay divides by their sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Weight>", into = "Vec<Weight>")]
pub struct WeightVector {
    entries: Vec<Weight>,
}

impl WeightVector {
    pub fn new(entries: Vec<Weight>) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::InvalidWeights("no criteria".into()));
        }
        for (i, w) in entries.iter().enumerate() {
            if !w.weight.is_finite() || w.weight < 0.0 {
                return Err(Error::InvalidWeights(format!(
                    "weight of '{}' is {}; weights must be finite and non-negative",
                    w.criterion, w.weight
                )));
            }
            if entries[..i].iter().any(|o| o.criterion == w.criterion) {
                return Err(Error::InvalidWeights(format!("criterion '{}' listed twice", w.criterion)));
            }
        }
        if entries.iter().all(|w| w.weight == 0.0) {
            return Err(Error::InvalidWeights("all weights are zero".into()));
        }
        Ok(Self { entries })
    }

    /// Build from `(name, weight)` pairs
    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (S, f64)>) -> Result<Self> {
        Self::new(pairs.into_iter().map(|(c, w)| Weight::new(c, w)).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Weight> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, criterion: &str) -> Option<f64> {
        self.entries.iter().find(|w| w.criterion == criterion).map(|w| w.weight)
    }

    /// Sum of all weights (the overlay's renormalization factor)
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|w| w.weight).sum()
    }
}

impl TryFrom<Vec<Weight>> for WeightVector {
    type Error = Error;

    fn try_from(entries: Vec<Weight>) -> Result<Self> {
        Self::new(entries)
    }
}

impl From<WeightVector> for Vec<Weight> {
    fn from(weights: WeightVector) -> Self {
        weights.entries
    }
}
