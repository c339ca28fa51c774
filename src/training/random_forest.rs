//! Random forest regressor

use crate::error::{Result, ScoreError};
use crate::optimizer::ParamValue;
use super::decision_tree::DecisionTreeRegressor;
use super::models::{
    bad_param, bool_param, check_features, check_training_data, optional_depth, unknown_param,
    usize_at_least, Estimator,
};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Strategy for features considered at each split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fraction of n_features
    Fraction(f64),
    /// All features
    All,
}

impl MaxFeatures {
    fn resolve(self, n_features: usize) -> usize {
        let n = n_features as f64;
        let k = match self {
            MaxFeatures::Sqrt => n.sqrt().ceil() as usize,
            MaxFeatures::Log2 => n.log2().ceil() as usize,
            MaxFeatures::Fraction(f) => (n * f).ceil() as usize,
            MaxFeatures::All => n_features,
        };
        k.clamp(1, n_features.max(1))
    }
}

/// Bagged ensemble of regression trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    pub random_state: u64,
    trees: Vec<DecisionTreeRegressor>,
    n_features: usize,
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForestRegressor {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            bootstrap: true,
            random_state: 42,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set max features strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Estimator for RandomForestRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        if self.n_estimators == 0 {
            return Err(ScoreError::ConfigError("n_estimators must be at least 1".to_string()));
        }
        let n_samples = x.nrows();
        self.n_features = x.ncols();
        let max_features = self.max_features.resolve(self.n_features);

        // Each tree owns a seed derived from its index, so the forest is the
        // same whatever order rayon runs the trees in
        let trees: Vec<DecisionTreeRegressor> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let seed = self.random_state.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let sample_indices: Vec<usize> = if self.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let mut tree = DecisionTreeRegressor::new();
                tree.max_depth = self.max_depth;
                tree.min_samples_split = self.min_samples_split;
                tree.min_samples_leaf = self.min_samples_leaf;
                tree.max_features = Some(max_features);
                tree.random_state = rng.gen();
                tree.fit_indices(x, y, &sample_indices)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(ScoreError::ModelNotFitted);
        }
        check_features(self.n_features, x)?;

        let mut sum = Array1::zeros(x.nrows());
        for tree in &self.trees {
            sum += &tree.predict(x)?;
        }
        Ok(sum / self.trees.len() as f64)
    }

    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "n_estimators" => self.n_estimators = usize_at_least(name, value, 1)?,
            "max_depth" => self.max_depth = optional_depth(name, value)?,
            "min_samples_split" => self.min_samples_split = usize_at_least(name, value, 2)?,
            "min_samples_leaf" => self.min_samples_leaf = usize_at_least(name, value, 1)?,
            "bootstrap" => self.bootstrap = bool_param(name, value)?,
            "max_features" => {
                self.max_features = match value {
                    ParamValue::Str(s) if s == "sqrt" => MaxFeatures::Sqrt,
                    ParamValue::Str(s) if s == "log2" => MaxFeatures::Log2,
                    ParamValue::Unset => MaxFeatures::All,
                    ParamValue::Float(f) if *f > 0.0 && *f <= 1.0 => MaxFeatures::Fraction(*f),
                    _ => return Err(bad_param(name, value, "expected \"sqrt\", \"log2\", None or a fraction")),
                }
            }
            _ => return Err(unknown_param("RandomForest", name, value)),
        }
        Ok(())
    }
}
