//! Gradient boosted regression trees
//!
//! Least-squares boosting: each round fits a shallow tree to the current
//! residuals and adds it, shrunk by the learning rate.

use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::decision_tree::DecisionTreeRegressor;
use super::models::{
    check_features, check_training_data, non_negative_f64, unit_fraction, unknown_param,
    usize_at_least, Estimator,
};
use crate::error::{Result, ScoreError};
use crate::optimizer::ParamValue;

/// Gradient Boosting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn without replacement for each tree
    pub subsample: f64,
    /// Random seed
    pub random_state: u64,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 1.0,
            random_state: 42,
        }
    }
}

/// Gradient Boosting Regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    config: GradientBoostingConfig,
    trees: Vec<DecisionTreeRegressor>,
    initial_prediction: f64,
    n_features: usize,
    is_fitted: bool,
}

impl Default for GradientBoostingRegressor {
    fn default() -> Self {
        Self::new(GradientBoostingConfig::default())
    }
}

impl GradientBoostingRegressor {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            initial_prediction: 0.0,
            n_features: 0,
            is_fitted: false,
        }
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        &self.config
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn subsample_indices(&self, n_samples: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        if self.config.subsample >= 1.0 {
            return (0..n_samples).collect();
        }
        let n_sub = ((n_samples as f64 * self.config.subsample).ceil() as usize).clamp(1, n_samples);
        let mut indices = rand::seq::index::sample(rng, n_samples, n_sub).into_vec();
        indices.sort_unstable();
        indices
    }
}

impl Estimator for GradientBoostingRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        let n_samples = x.nrows();
        self.n_features = x.ncols();
        self.trees.clear();

        self.initial_prediction = y.mean().unwrap_or(0.0);
        let mut predictions = Array1::from_elem(n_samples, self.initial_prediction);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);

        for _ in 0..self.config.n_estimators {
            let residuals = y - &predictions;
            let sample_indices = self.subsample_indices(n_samples, &mut rng);

            let mut tree = DecisionTreeRegressor::new()
                .with_max_depth(self.config.max_depth)
                .with_min_samples_leaf(self.config.min_samples_leaf);
            tree.fit_indices(x, &residuals, &sample_indices)?;

            let update = tree.predict(x)?;
            predictions.scaled_add(self.config.learning_rate, &update);
            self.trees.push(tree);
        }

        self.is_fitted = true;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(ScoreError::ModelNotFitted);
        }
        check_features(self.n_features, x)?;

        let mut predictions = Array1::from_elem(x.nrows(), self.initial_prediction);
        for tree in &self.trees {
            predictions.scaled_add(self.config.learning_rate, &tree.predict(x)?);
        }
        Ok(predictions)
    }

    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "n_estimators" => self.config.n_estimators = usize_at_least(name, value, 1)?,
            "learning_rate" => self.config.learning_rate = non_negative_f64(name, value)?,
            "max_depth" => self.config.max_depth = usize_at_least(name, value, 1)?,
            "min_samples_leaf" => self.config.min_samples_leaf = usize_at_least(name, value, 1)?,
            "subsample" => self.config.subsample = unit_fraction(name, value)?,
            _ => return Err(unknown_param("GradientBoosting", name, value)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn data() -> (Array2<f64>, Array1<f64>) {
        let x = Array::from_shape_fn((50, 2), |(i, j)| ((i * (j + 1)) % 17) as f64);
        let y = x.column(0).mapv(|v| v * v) + &x.column(1);
        (x, y)
    }

    #[test]
    fn test_boosting_reduces_error() {
        let (x, y) = data();
        let mut short = GradientBoostingRegressor::new(GradientBoostingConfig {
            n_estimators: 2,
            ..Default::default()
        });
        let mut long = GradientBoostingRegressor::new(GradientBoostingConfig {
            n_estimators: 60,
            ..Default::default()
        });
        short.fit(&x, &y).unwrap();
        long.fit(&x, &y).unwrap();

        assert!(long.score(&x, &y).unwrap() > short.score(&x, &y).unwrap());
        assert!(long.score(&x, &y).unwrap() > 0.95);
        assert_eq!(long.n_trees(), 60);
    }

    #[test]
    fn test_subsample_is_seeded() {
        let (x, y) = data();
        let config = GradientBoostingConfig {
            n_estimators: 10,
            subsample: 0.5,
            ..Default::default()
        };
        let mut a = GradientBoostingRegressor::new(config.clone());
        let mut b = GradientBoostingRegressor::new(config);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_set_param() {
        let mut gb = GradientBoostingRegressor::default();
        gb.set_param("learning_rate", &ParamValue::Float(0.05)).unwrap();
        gb.set_param("subsample", &ParamValue::Float(0.8)).unwrap();
        assert_eq!(gb.config().learning_rate, 0.05);
        assert!(gb.set_param("subsample", &ParamValue::Float(1.5)).is_err());
    }
}
