//! Search configuration

use crate::error::{Result, ScoreError};
use serde::{Deserialize, Serialize};

/// How one model family's hyperparameters are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Empty search space: a single fit with default hyperparameters
    DirectFit,
    /// Every combination cross-validated
    Exhaustive { combinations: usize },
    /// `n_iter` sampled combinations cross-validated
    Randomized { combinations: usize, n_iter: usize },
}

impl SearchStrategy {
    /// Number of candidate parameter sets evaluated
    pub fn n_candidates(&self) -> usize {
        match self {
            SearchStrategy::DirectFit => 1,
            SearchStrategy::Exhaustive { combinations } => *combinations,
            SearchStrategy::Randomized { n_iter, .. } => *n_iter,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SearchStrategy::DirectFit => "fit",
            SearchStrategy::Exhaustive { .. } => "grid",
            SearchStrategy::Randomized { .. } => "random",
        }
    }
}

/// Configuration for the hyperparameter search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Cross-validation folds per candidate
    pub cv_folds: usize,

    /// Largest combination count searched exhaustively
    pub grid_limit: usize,

    /// Lower bound on randomized search iterations
    pub min_iter: usize,

    /// Upper bound on randomized search iterations
    pub max_iter: usize,

    /// Seed for randomized search
    pub seed: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            cv_folds: 3,
            grid_limit: 60,
            min_iter: 15,
            max_iter: 60,
            seed: 42,
        }
    }
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cv_folds(mut self, cv_folds: usize) -> Self {
        self.cv_folds = cv_folds;
        self
    }

    pub fn with_grid_limit(mut self, grid_limit: usize) -> Self {
        self.grid_limit = grid_limit;
        self
    }

    /// Set both randomized search bounds
    pub fn with_iter_bounds(mut self, min_iter: usize, max_iter: usize) -> Self {
        self.min_iter = min_iter;
        self.max_iter = max_iter;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.cv_folds < 2 {
            return Err(ScoreError::ConfigError(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        if self.grid_limit == 0 {
            return Err(ScoreError::ConfigError("grid_limit must be at least 1".to_string()));
        }
        if self.min_iter == 0 {
            return Err(ScoreError::ConfigError("min_iter must be at least 1".to_string()));
        }
        if self.min_iter > self.max_iter {
            return Err(ScoreError::ConfigError(format!(
                "min_iter ({}) must not exceed max_iter ({})",
                self.min_iter, self.max_iter
            )));
        }
        Ok(())
    }

    /// Pick the strategy for a space with `combinations` combinations.
    ///
    /// Randomized search runs `clamp(combinations, min_iter, max_iter)`
    /// iterations; an enumerable space never samples more combinations
    /// than it has.
    pub fn strategy_for(&self, combinations: usize, is_empty: bool, enumerable: bool) -> SearchStrategy {
        if is_empty {
            return SearchStrategy::DirectFit;
        }
        if enumerable && combinations <= self.grid_limit {
            return SearchStrategy::Exhaustive { combinations };
        }
        let mut n_iter = combinations.max(self.min_iter).min(self.max_iter);
        if enumerable {
            n_iter = n_iter.min(combinations);
        }
        SearchStrategy::Randomized {
            combinations,
            n_iter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SearchConfig::default();
        assert_eq!(config.cv_folds, 3);
        assert_eq!(config.grid_limit, 60);
        assert_eq!((config.min_iter, config.max_iter), (15, 60));
        assert_eq!(config.seed, 42);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(SearchConfig::new().with_cv_folds(1).validate().is_err());
        assert!(SearchConfig::new().with_grid_limit(0).validate().is_err());
        assert!(SearchConfig::new().with_iter_bounds(0, 10).validate().is_err());
        assert!(SearchConfig::new().with_iter_bounds(20, 10).validate().is_err());
    }

    #[test]
    fn test_strategy_switch() {
        let config = SearchConfig::default();
        assert_eq!(config.strategy_for(1, true, true), SearchStrategy::DirectFit);
        assert_eq!(
            config.strategy_for(60, false, true),
            SearchStrategy::Exhaustive { combinations: 60 }
        );
        assert_eq!(
            config.strategy_for(61, false, true),
            SearchStrategy::Randomized { combinations: 61, n_iter: 60 }
        );
        assert_eq!(
            config.strategy_for(500, false, true),
            SearchStrategy::Randomized { combinations: 500, n_iter: 60 }
        );
    }

    #[test]
    fn test_strategy_with_distribution() {
        let config = SearchConfig::default();
        assert_eq!(
            config.strategy_for(2, false, false),
            SearchStrategy::Randomized { combinations: 2, n_iter: 15 }
        );
    }

    #[test]
    fn test_n_iter_clamped_up_to_min_iter() {
        let config = SearchConfig::default().with_grid_limit(5).with_iter_bounds(15, 60);
        assert_eq!(
            config.strategy_for(8, false, true),
            SearchStrategy::Randomized { combinations: 8, n_iter: 8 }
        );
        assert_eq!(
            config.strategy_for(20, false, true),
            SearchStrategy::Randomized { combinations: 20, n_iter: 20 }
        );
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SearchConfig = serde_json::from_str(r#"{"cv_folds": 5}"#).unwrap();
        assert_eq!(config.cv_folds, 5);
        assert_eq!(config.grid_limit, 60);
    }
}
