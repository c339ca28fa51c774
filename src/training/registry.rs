//! Default model families and their search spaces

use super::decision_tree::DecisionTreeRegressor;
use super::engine::Regressor;
use super::gradient_boosting::GradientBoostingRegressor;
use super::knn::KNNRegressor;
use super::linear_models::{LassoRegression, LinearRegression, RidgeRegression};
use super::random_forest::RandomForestRegressor;
use crate::optimizer::{ParamValue, SearchSpace};
use std::collections::BTreeMap;

pub const LINEAR_REGRESSION: &str = "Linear Regression";
pub const RIDGE: &str = "Ridge";
pub const LASSO: &str = "Lasso";
pub const K_NEIGHBORS: &str = "K-Neighbors";
pub const DECISION_TREE: &str = "Decision Tree";
pub const RANDOM_FOREST: &str = "Random Forest";
pub const GRADIENT_BOOSTING: &str = "Gradient Boosting";

/// Families in evaluation order; earlier families win held-out ties
pub fn default_candidates() -> Vec<(String, Regressor)> {
    vec![
        (LINEAR_REGRESSION.to_string(), LinearRegression::new().into()),
        (RIDGE.to_string(), RidgeRegression::default().into()),
        (LASSO.to_string(), LassoRegression::default().into()),
        (K_NEIGHBORS.to_string(), KNNRegressor::default().into()),
        (DECISION_TREE.to_string(), DecisionTreeRegressor::new().into()),
        (RANDOM_FOREST.to_string(), RandomForestRegressor::default().into()),
        (GRADIENT_BOOSTING.to_string(), GradientBoostingRegressor::default().into()),
    ]
}

/// Grids for [`default_candidates`].
///
/// Decision Tree (80 combinations) and Gradient Boosting (72) exceed the
/// default grid limit and are sampled.
pub fn default_search_spaces() -> BTreeMap<String, SearchSpace> {
    let mut spaces = BTreeMap::new();
    spaces.insert(LINEAR_REGRESSION.to_string(), SearchSpace::new());
    spaces.insert(
        RIDGE.to_string(),
        SearchSpace::new().values("alpha", vec![0.01, 0.1, 1.0, 10.0, 100.0]),
    );
    spaces.insert(
        LASSO.to_string(),
        SearchSpace::new()
            .values("alpha", vec![0.001, 0.01, 0.1, 1.0])
            .values("max_iter", vec![1000i64, 5000]),
    );
    spaces.insert(
        K_NEIGHBORS.to_string(),
        SearchSpace::new()
            .values("n_neighbors", vec![3i64, 5, 7, 9, 11, 15])
            .values("weights", vec!["uniform", "distance"])
            .values("p", vec![1i64, 2]),
    );
    spaces.insert(
        DECISION_TREE.to_string(),
        SearchSpace::new()
            .values(
                "max_depth",
                vec![
                    ParamValue::Unset,
                    ParamValue::Int(3),
                    ParamValue::Int(5),
                    ParamValue::Int(8),
                    ParamValue::Int(12),
                ],
            )
            .values("min_samples_split", vec![2i64, 5, 10, 20])
            .values("min_samples_leaf", vec![1i64, 2, 4, 8]),
    );
    spaces.insert(
        RANDOM_FOREST.to_string(),
        SearchSpace::new()
            .values("n_estimators", vec![50i64, 100])
            .values("max_depth", vec![ParamValue::Unset, ParamValue::Int(8)])
            .values("max_features", vec![ParamValue::from("sqrt"), ParamValue::Unset])
            .values("min_samples_leaf", vec![1i64, 3, 5]),
    );
    spaces.insert(
        GRADIENT_BOOSTING.to_string(),
        SearchSpace::new()
            .values("n_estimators", vec![50i64, 100, 200])
            .values("learning_rate", vec![0.01, 0.05, 0.1, 0.2])
            .values("max_depth", vec![2i64, 3, 4])
            .values("subsample", vec![0.8, 1.0]),
    );
    spaces
}
