//! K-nearest neighbours regression

use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::models::{bad_param, check_features, check_training_data, unknown_param, usize_at_least, Estimator};
use crate::error::{Result, ScoreError};
use crate::optimizer::ParamValue;

/// Distance metric for KNN
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Euclidean distance (L2)
    #[default]
    Euclidean,
    /// Manhattan distance (L1)
    Manhattan,
    /// Minkowski distance with parameter p
    Minkowski(f64),
}

/// Weighting scheme for neighbors
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum WeightScheme {
    /// All neighbors have equal weight
    #[default]
    Uniform,
    /// Closer neighbors have more weight (inverse distance)
    Distance,
}

/// KNN configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KNNConfig {
    /// Number of neighbors
    pub n_neighbors: usize,
    pub metric: DistanceMetric,
    pub weights: WeightScheme,
}

impl Default for KNNConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            metric: DistanceMetric::Euclidean,
            weights: WeightScheme::Uniform,
        }
    }
}

/// K-Nearest Neighbors Regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNRegressor {
    config: KNNConfig,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
}

impl Default for KNNRegressor {
    fn default() -> Self {
        Self::new(KNNConfig::default())
    }
}

impl KNNRegressor {
    pub fn new(config: KNNConfig) -> Self {
        Self {
            config,
            x_train: None,
            y_train: None,
        }
    }

    /// Create with default config and specified k
    pub fn with_k(k: usize) -> Self {
        Self::new(KNNConfig {
            n_neighbors: k,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &KNNConfig {
        &self.config
    }
}

impl Estimator for KNNRegressor {
    /// Stores the training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        if self.config.n_neighbors == 0 {
            return Err(ScoreError::ConfigError("n_neighbors must be at least 1".to_string()));
        }
        self.x_train = Some(x.as_standard_layout().to_owned());
        self.y_train = Some(y.clone());
        Ok(())
    }

    /// Predict target values (parallelized over query rows)
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (x_train, y_train) = match (&self.x_train, &self.y_train) {
            (Some(x_train), Some(y_train)) => (x_train, y_train),
            _ => return Err(ScoreError::ModelNotFitted),
        };
        check_features(x_train.ncols(), x)?;
        let k = self.config.n_neighbors.min(x_train.nrows());

        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let point = x.row(i).to_vec();
                let neighbors = find_k_nearest(&point, x_train, y_train, k, self.config.metric);
                weighted_mean(&neighbors, self.config.weights)
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "n_neighbors" => self.config.n_neighbors = usize_at_least(name, value, 1)?,
            "weights" => {
                self.config.weights = match value.as_str() {
                    Some("uniform") => WeightScheme::Uniform,
                    Some("distance") => WeightScheme::Distance,
                    _ => return Err(bad_param(name, value, "expected \"uniform\" or \"distance\"")),
                }
            }
            "p" => {
                self.config.metric = match value.as_f64() {
                    Some(p) if p == 1.0 => DistanceMetric::Manhattan,
                    Some(p) if p == 2.0 => DistanceMetric::Euclidean,
                    Some(p) if p >= 1.0 => DistanceMetric::Minkowski(p),
                    _ => return Err(bad_param(name, value, "expected a number >= 1")),
                }
            }
            _ => return Err(unknown_param("KNeighbors", name, value)),
        }
        Ok(())
    }
}

/// Max-heap entry; ties in distance fall back to training row order
struct Neighbor {
    dist: f64,
    index: usize,
    target: f64,
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .total_cmp(&other.dist)
            .then_with(|| self.index.cmp(&other.index))
    }
}

/// Find k nearest neighbors using a max-heap, O(n log k)
fn find_k_nearest(
    point: &[f64],
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    k: usize,
    metric: DistanceMetric,
) -> Vec<(f64, f64)> {
    let mut heap = BinaryHeap::with_capacity(k + 1);

    for (index, row) in x_train.outer_iter().enumerate() {
        let dist = compute_distance(point, row.iter().copied(), metric);
        let candidate = Neighbor {
            dist,
            index,
            target: y_train[index],
        };
        if heap.len() < k {
            heap.push(candidate);
        } else if heap.peek().map_or(false, |top| candidate < *top) {
            heap.pop();
            heap.push(candidate);
        }
    }

    heap.into_sorted_vec()
        .into_iter()
        .map(|n| (n.dist, n.target))
        .collect()
}

fn compute_distance(a: &[f64], b: impl Iterator<Item = f64>, metric: DistanceMetric) -> f64 {
    let diffs = a.iter().zip(b).map(|(ai, bi)| (ai - bi).abs());
    match metric {
        DistanceMetric::Euclidean => diffs.map(|d| d * d).sum::<f64>().sqrt(),
        DistanceMetric::Manhattan => diffs.sum(),
        DistanceMetric::Minkowski(p) => diffs.map(|d| d.powf(p)).sum::<f64>().powf(1.0 / p),
    }
}

fn weighted_mean(neighbors: &[(f64, f64)], weights: WeightScheme) -> f64 {
    let uniform = || neighbors.iter().map(|(_, y)| y).sum::<f64>() / neighbors.len() as f64;
    match weights {
        WeightScheme::Uniform => uniform(),
        WeightScheme::Distance => {
            // an exact match takes the prediction outright
            let exact: Vec<f64> = neighbors.iter().filter(|(d, _)| *d == 0.0).map(|(_, y)| *y).collect();
            if !exact.is_empty() {
                return exact.iter().sum::<f64>() / exact.len() as f64;
            }
            let (sum, total) = neighbors
                .iter()
                .fold((0.0, 0.0), |(s, t), &(d, y)| (s + y / d, t + 1.0 / d));
            if total > 0.0 {
                sum / total
            } else {
                uniform()
            }
        }
    }
}
