//! Rule-based reclassification
//!
//! An ordered list of `(predicate, outcome)` rules, evaluated first match
//! wins. A rule set is only constructible when its predicates jointly cover
//! the whole real line, so every valid input value has an outcome.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::ops::Bound;
use postfire_core::{Error, Result};

fn inclusive() -> bool {
    true
}

/// Condition on a single cell value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Matches every value (catch-all default)
    Any,
    /// `v < x`
    Lt(f64),
    /// `v <= x`
    Le(f64),
    /// `v > x`
    Gt(f64),
    /// `v >= x`
    Ge(f64),
    /// `min <= v <= max`, each end optionally open
    Between {
        min: f64,
        max: f64,
        #[serde(default = "inclusive")]
        min_inclusive: bool,
        #[serde(default = "inclusive")]
        max_inclusive: bool,
    },
}

impl Predicate {
    /// Closed interval `[min, max]`
    pub fn between(min: f64, max: f64) -> Self {
        Predicate::Between { min, max, min_inclusive: true, max_inclusive: true }
    }

    /// Half-open interval `(min, max]`
    pub fn above_up_to(min: f64, max: f64) -> Self {
        Predicate::Between { min, max, min_inclusive: false, max_inclusive: true }
    }

    pub fn matches(&self, v: f64) -> bool {
        match *self {
            Predicate::Any => true,
            Predicate::Lt(x) => v < x,
            Predicate::Le(x) => v <= x,
            Predicate::Gt(x) => v > x,
            Predicate::Ge(x) => v >= x,
            Predicate::Between { min, max, min_inclusive, max_inclusive } => {
                let lo = if min_inclusive { v >= min } else { v > min };
                let hi = if max_inclusive { v <= max } else { v < max };
                lo && hi
            }
        }
    }

    fn thresholds(&self) -> Vec<f64> {
        match *self {
            Predicate::Any => vec![],
            Predicate::Lt(x) | Predicate::Le(x) | Predicate::Gt(x) | Predicate::Ge(x) => vec![x],
            Predicate::Between { min, max, .. } => vec![min, max],
        }
    }

    /// The set of matching values as an interval `(lower, upper)`
    fn interval(&self) -> (Bound<f64>, Bound<f64>) {
        use Bound::*;
        match *self {
            Predicate::Any => (Unbounded, Unbounded),
            Predicate::Lt(x) => (Unbounded, Excluded(x)),
            Predicate::Le(x) => (Unbounded, Included(x)),
            Predicate::Gt(x) => (Excluded(x), Unbounded),
            Predicate::Ge(x) => (Included(x), Unbounded),
            Predicate::Between { min, max, min_inclusive, max_inclusive } => (
                if min_inclusive { Included(min) } else { Excluded(min) },
                if max_inclusive { Included(max) } else { Excluded(max) },
            ),
        }
    }
}

/// What a matching rule produces
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Output score
    Value(f64),
    /// Cell becomes invalid
    NoData,
}

impl Outcome {
    fn as_cell(self) -> f64 {
        match self {
            Outcome::Value(v) => v,
            Outcome::NoData => f64::NAN,
        }
    }
}

/// A single reclassification rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReclassRule {
    pub when: Predicate,
    pub then: Outcome,
}

impl ReclassRule {
    pub fn new(when: Predicate, then: Outcome) -> Self {
        Self { when, then }
    }

    /// Rule producing a score
    pub fn score(when: Predicate, value: f64) -> Self {
        Self::new(when, Outcome::Value(value))
    }
}

/// Ordered, exhaustive rule list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ReclassRule>", into = "Vec<ReclassRule>")]
pub struct ReclassRules {
    rules: Vec<ReclassRule>,
}

impl ReclassRules {
    /// Validate and build a rule set.
    ///
    /// Fails with [`Error::UnreachableReclass`] when some values would match
    /// no rule, and with [`Error::InvalidParameter`] on NaN thresholds or
    /// reversed intervals.
    pub fn new(rules: Vec<ReclassRule>) -> Result<Self> {
        if rules.is_empty() {
            return Err(Error::UnreachableReclass("rule list is empty".into()));
        }
        for rule in &rules {
            if rule.when.thresholds().iter().any(|t| t.is_nan()) {
                return Err(Error::invalid_parameter("rule", format!("{:?}", rule.when), "threshold is NaN"));
            }
            if let Predicate::Between { min, max, .. } = rule.when {
                if min > max {
                    return Err(Error::invalid_parameter("rule", format!("{:?}", rule.when), "min exceeds max"));
                }
            }
            if let Outcome::Value(v) = rule.then {
                if !v.is_finite() {
                    return Err(Error::invalid_parameter("rule", format!("{v}"), "output must be finite"));
                }
            }
        }
        check_coverage(&rules)?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[ReclassRule] {
        &self.rules
    }

    /// Outcome of the first rule matching `v`.
    pub fn evaluate(&self, v: f64) -> Option<Outcome> {
        self.rules.iter().find(|r| r.when.matches(v)).map(|r| r.then)
    }

    /// Cell value for `v`: the first matching score, NaN for no-data.
    pub(crate) fn apply(&self, v: f64) -> f64 {
        // coverage is checked on construction, so a valid value always matches
        self.evaluate(v).map_or(f64::NAN, Outcome::as_cell)
    }
}

impl TryFrom<Vec<ReclassRule>> for ReclassRules {
    type Error = Error;

    fn try_from(rules: Vec<ReclassRule>) -> Result<Self> {
        Self::new(rules)
    }
}

impl From<ReclassRules> for Vec<ReclassRule> {
    fn from(rules: ReclassRules) -> Self {
        rules.rules
    }
}

/// Ordering of lower bounds: -inf first, then by value, closed before open.
fn cmp_lower(a: &Bound<f64>, b: &Bound<f64>) -> Ordering {
    use Bound::*;
    match (a, b) {
        (Unbounded, Unbounded) => Ordering::Equal,
        (Unbounded, _) => Ordering::Less,
        (_, Unbounded) => Ordering::Greater,
        (Included(x) | Excluded(x), Included(y) | Excluded(y)) => x
            .total_cmp(y)
            .then_with(|| matches!(a, Excluded(_)).cmp(&matches!(b, Excluded(_)))),
    }
}

/// Larger of two upper bounds (+inf largest, closed beats open at a tie).
fn max_upper(a: Bound<f64>, b: Bound<f64>) -> Bound<f64> {
    use Bound::*;
    match (a, b) {
        (Unbounded, _) | (_, Unbounded) => Unbounded,
        (Included(x) | Excluded(x), Included(y) | Excluded(y)) => match x.total_cmp(&y) {
            Ordering::Greater => a,
            Ordering::Less => b,
            Ordering::Equal if matches!(a, Included(_)) => a,
            Ordering::Equal => b,
        },
    }
}

fn is_empty(lo: &Bound<f64>, hi: &Bound<f64>) -> bool {
    use Bound::*;
    match (lo, hi) {
        (Included(a), Included(b)) => a > b,
        (Included(a) | Excluded(a), Included(b) | Excluded(b)) => a >= b,
        _ => false,
    }
}

/// Sweep the rule intervals left to right and report the first value range
/// that no rule reaches.
fn check_coverage(rules: &[ReclassRule]) -> Result<()> {
    use Bound::*;

    let mut intervals: Vec<_> = rules
        .iter()
        .map(|r| r.when.interval())
        .filter(|(lo, hi)| !is_empty(lo, hi))
        .collect();
    intervals.sort_by(|a, b| cmp_lower(&a.0, &b.0));

    let gap = |msg: String| Err(Error::UnreachableReclass(msg));

    // None until something reaching down to -inf has been seen
    let mut reach: Option<Bound<f64>> = None;
    for (lo, hi) in intervals {
        match (reach, lo) {
            (Some(Unbounded), _) => return Ok(()),
            (None, Unbounded) => {}
            (None, Included(a) | Excluded(a)) => {
                return gap(format!("values below {a} match no rule"));
            }
            (Some(_), Unbounded) => {}
            (Some(Included(r)), Included(a) | Excluded(a)) if a <= r => {}
            (Some(Excluded(r)), Included(a)) if a <= r => {}
            (Some(Excluded(r)), Excluded(a)) if a < r => {}
            (Some(Excluded(r)), Excluded(a)) if a == r => {
                return gap(format!("value {r} matches no rule"));
            }
            (Some(Included(r) | Excluded(r)), Included(a) | Excluded(a)) => {
                return gap(format!("values between {r} and {a} match no rule"));
            }
        }
        reach = Some(reach.map_or(hi, |r| max_upper(r, hi)));
    }

    match reach {
        Some(Unbounded) => Ok(()),
        Some(Included(r) | Excluded(r)) => gap(format!("values above {r} match no rule")),
        None => gap("no rule matches any value".into()),
    }
}
