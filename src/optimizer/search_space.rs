//! Search space definition for hyperparameters

use crate::error::{Result, ScoreError};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A concrete hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    /// No limit / library default, e.g. an unbounded tree depth
    Unset,
}

impl ParamValue {
    /// Get as float; integers widen
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Get as a non-negative integer
    pub fn as_usize(&self) -> Option<usize> {
        match self {
            ParamValue::Int(v) => usize::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, ParamValue::Unset)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Str(v) => write!(f, "{}", v),
            ParamValue::Unset => write!(f, "None"),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

/// One assignment of hyperparameters, keyed by name
pub type ParamSet = BTreeMap<String, ParamValue>;

/// Render a parameter set as `a=1, b=x`
pub fn format_params(params: &ParamSet) -> String {
    if params.is_empty() {
        return "(defaults)".to_string();
    }
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Continuous or integer range sampled during randomized search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Distribution {
    /// Continuous float parameter
    Float { low: f64, high: f64, log_scale: bool },
    /// Integer parameter, both ends inclusive
    Int { low: i64, high: i64 },
}

impl Distribution {
    pub fn float(low: f64, high: f64) -> Self {
        Distribution::Float {
            low,
            high,
            log_scale: false,
        }
    }

    pub fn log_float(low: f64, high: f64) -> Self {
        Distribution::Float {
            low,
            high,
            log_scale: true,
        }
    }

    pub fn int(low: i64, high: i64) -> Self {
        Distribution::Int { low, high }
    }

    fn validate(&self, name: &str) -> Result<()> {
        let ok = match self {
            Distribution::Float { low, high, log_scale } => {
                low < high && (!log_scale || *low > 0.0)
            }
            Distribution::Int { low, high } => low <= high,
        };
        if ok {
            Ok(())
        } else {
            Err(ScoreError::ConfigError(format!(
                "invalid distribution for '{}': {:?}",
                name, self
            )))
        }
    }

    /// Sample a random value
    pub fn sample(&self, rng: &mut impl Rng) -> ParamValue {
        match self {
            Distribution::Float { low, high, log_scale } => {
                let val = if *log_scale {
                    let log_low = low.ln();
                    let log_high = high.ln();
                    (rng.gen::<f64>() * (log_high - log_low) + log_low).exp()
                } else {
                    rng.gen::<f64>() * (high - low) + low
                };
                ParamValue::Float(val)
            }
            Distribution::Int { low, high } => ParamValue::Int(rng.gen_range(*low..=*high)),
        }
    }
}

/// Candidate values for one hyperparameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamCandidates {
    /// Ordered, countable set of values
    Values(Vec<ParamValue>),
    /// Uncountable range; counts as a single combination
    Distribution(Distribution),
}

impl ParamCandidates {
    /// Contribution to the combination count
    pub fn multiplicity(&self) -> usize {
        match self {
            ParamCandidates::Values(values) => values.len(),
            ParamCandidates::Distribution(_) => 1,
        }
    }

    fn sample(&self, rng: &mut impl Rng) -> ParamValue {
        match self {
            ParamCandidates::Values(values) => values[rng.gen_range(0..values.len())].clone(),
            ParamCandidates::Distribution(dist) => dist.sample(rng),
        }
    }
}

/// Hyperparameter candidates for one model family.
///
/// Parameters are kept sorted by name; that order fixes both grid
/// enumeration and the index decoding used by randomized search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    parameters: BTreeMap<String, ParamCandidates>,
}

impl SearchSpace {
    /// Create a new empty search space
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a list of candidate values
    pub fn values<V: Into<ParamValue>>(mut self, name: impl Into<String>, values: Vec<V>) -> Self {
        self.parameters.insert(
            name.into(),
            ParamCandidates::Values(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    /// Add a sampled range
    pub fn distribution(mut self, name: impl Into<String>, dist: Distribution) -> Self {
        self.parameters
            .insert(name.into(), ParamCandidates::Distribution(dist));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn get(&self, name: &str) -> Option<&ParamCandidates> {
        self.parameters.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    /// Reject empty value lists and malformed ranges
    pub fn validate(&self) -> Result<()> {
        for (name, candidates) in &self.parameters {
            match candidates {
                ParamCandidates::Values(values) if values.is_empty() => {
                    return Err(ScoreError::ConfigError(format!(
                        "hyperparameter '{}' has no candidate values",
                        name
                    )));
                }
                ParamCandidates::Distribution(dist) => dist.validate(name)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// Product of candidate counts; a distribution contributes 1 and an
    /// empty space has exactly one (default) combination
    pub fn combinations(&self) -> usize {
        self.parameters
            .values()
            .map(ParamCandidates::multiplicity)
            .fold(1usize, |acc, m| acc.saturating_mul(m))
    }

    /// Whether every hyperparameter is a finite list of values
    pub fn is_enumerable(&self) -> bool {
        self.parameters
            .values()
            .all(|c| matches!(c, ParamCandidates::Values(_)))
    }

    /// Decode combination `index` in mixed radix; the last parameter by name
    /// varies fastest. Only meaningful for enumerable spaces.
    pub fn combination(&self, mut index: usize) -> ParamSet {
        let mut params = ParamSet::new();
        for (name, candidates) in self.parameters.iter().rev() {
            if let ParamCandidates::Values(values) = candidates {
                params.insert(name.clone(), values[index % values.len()].clone());
                index /= values.len();
            }
        }
        params
    }

    /// Every combination in enumeration order
    pub fn grid(&self) -> Result<Vec<ParamSet>> {
        if !self.is_enumerable() {
            return Err(ScoreError::ConfigError(
                "cannot enumerate a search space containing distributions".to_string(),
            ));
        }
        Ok((0..self.combinations()).map(|i| self.combination(i)).collect())
    }

    /// Draw `n_iter` parameter sets.
    ///
    /// Enumerable spaces yield distinct combinations (at most all of them),
    /// returned in enumeration order. Spaces with distributions draw each
    /// parameter independently.
    pub fn sample(&self, n_iter: usize, rng: &mut impl Rng) -> Vec<ParamSet> {
        if self.is_enumerable() {
            let total = self.combinations();
            let mut indices = rand::seq::index::sample(rng, total, n_iter.min(total)).into_vec();
            indices.sort_unstable();
            return indices.into_iter().map(|i| self.combination(i)).collect();
        }

        (0..n_iter)
            .map(|_| {
                self.parameters
                    .iter()
                    .map(|(name, candidates)| (name.clone(), candidates.sample(rng)))
                    .collect()
            })
            .collect()
    }
}
