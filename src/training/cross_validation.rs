//! K-fold cross-validation

use crate::error::{Result, ScoreError};
use super::models::Estimator;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// A single train/test split
#[derive(Debug, Clone, PartialEq)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Contiguous, unshuffled k-fold splitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossValidator {
    n_splits: usize,
}

impl CrossValidator {
    pub fn k_fold(n_splits: usize) -> Self {
        Self { n_splits }
    }

    /// Generate train/test splits.
    ///
    /// The first `n_samples % n_splits` folds hold one extra sample.
    pub fn split(&self, n_samples: usize) -> Result<Vec<CVSplit>> {
        let n_splits = self.n_splits;
        if n_splits < 2 {
            return Err(ScoreError::ConfigError("n_splits must be at least 2".to_string()));
        }
        if n_samples < n_splits {
            return Err(ScoreError::DataShapeError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, n_splits
            )));
        }

        let indices: Vec<usize> = (0..n_samples).collect();

        let base = n_samples / n_splits;
        let remainder = n_samples % n_splits;
        let mut splits = Vec::with_capacity(n_splits);
        let mut current = 0;

        for fold_idx in 0..n_splits {
            let fold_size = if fold_idx < remainder { base + 1 } else { base };
            let test_indices = indices[current..current + fold_size].to_vec();
            let train_indices = indices[..current]
                .iter()
                .chain(&indices[current + fold_size..])
                .copied()
                .collect();

            splits.push(CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            });
            current += fold_size;
        }

        Ok(splits)
    }

    /// Fit a clone of `template` on each training fold and score R² on the
    /// matching test fold
    pub fn cross_validate<E: Estimator>(
        &self,
        template: &E,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<CVResults> {
        let splits = self.split(x.nrows())?;
        let mut scores = Vec::with_capacity(splits.len());

        for split in &splits {
            let x_train = x.select(Axis(0), &split.train_indices);
            let y_train = y.select(Axis(0), &split.train_indices);
            let x_test = x.select(Axis(0), &split.test_indices);
            let y_test = y.select(Axis(0), &split.test_indices);

            let mut model = template.clone();
            model.fit(&x_train, &y_train)?;
            scores.push(model.score(&x_test, &y_test)?);
        }

        Ok(CVResults::from_scores(scores))
    }
}

/// Per-fold scores with summary statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each fold
    pub scores: Vec<f64>,
    /// Mean score across folds
    pub mean_score: f64,
    /// Standard deviation of scores
    pub std_score: f64,
    /// Number of folds
    pub n_folds: usize,
}

impl CVResults {
    /// Create CV results from fold scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len();
        if n_folds == 0 {
            return Self {
                scores,
                mean_score: f64::NAN,
                std_score: 0.0,
                n_folds,
            };
        }
        let mean_score = scores.iter().sum::<f64>() / n_folds as f64;
        let variance = scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds as f64;

        Self {
            scores,
            mean_score,
            std_score: variance.sqrt(),
            n_folds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::LinearRegression;
    use ndarray::Array;

    #[test]
    fn test_k_fold() {
        let cv = CrossValidator::k_fold(5);
        let splits = cv.split(100).unwrap();

        assert_eq!(splits.len(), 5);
        for split in &splits {
            assert_eq!(split.test_indices.len(), 20);
            assert_eq!(split.train_indices.len(), 80);
        }
        assert_eq!(splits[0].test_indices, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_k_fold_uneven() {
        let splits = CrossValidator::k_fold(3).split(10).unwrap();
        let sizes: Vec<usize> = splits.iter().map(|s| s.test_indices.len()).collect();
        assert_eq!(sizes, vec![4, 3, 3]);

        let mut all: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_too_few_samples() {
        assert!(CrossValidator::k_fold(5).split(3).is_err());
        assert!(CrossValidator::k_fold(1).split(3).is_err());
    }

    #[test]
    fn test_cross_validate_linear() {
        let x = Array::from_shape_fn((30, 1), |(i, _)| i as f64);
        let y = x.column(0).mapv(|v| 2.0 * v + 1.0);
        let results = CrossValidator::k_fold(3)
            .cross_validate(&LinearRegression::new(), &x, &y)
            .unwrap();

        assert_eq!(results.n_folds, 3);
        assert!(results.mean_score > 0.999);
    }

    #[test]
    fn test_cv_results() {
        let results = CVResults::from_scores(vec![0.8, 0.85, 0.9, 0.82, 0.88]);
        assert_eq!(results.n_folds, 5);
        assert!((results.mean_score - 0.85).abs() < 0.01);
        assert!(results.std_score > 0.0);
    }
}
