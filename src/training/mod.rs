//! Model training module
//!
//! Provides the regressors a training run chooses between:
//! - Ordinary least squares, Ridge and Lasso
//! - K-nearest neighbours
//! - Decision tree, random forest and gradient boosting
//!
//! Each implements [`Estimator`]; [`Regressor`] wraps them in a closed enum
//! so the winner can be persisted. [`TrainingPipeline`] ties preprocessing,
//! search and persistence together.

mod config;
mod engine;
mod models;
mod pipeline;
pub mod cross_validation;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod knn;
pub mod linear_models;
pub mod random_forest;
pub mod registry;

pub use config::TrainingConfig;
pub use engine::Regressor;
pub use models::{r2_score, Estimator};
pub use pipeline::{TrainingPipeline, TrainingReport};
pub use cross_validation::{CVResults, CVSplit, CrossValidator};
pub use decision_tree::{DecisionTreeRegressor, TreeNode};
pub use gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
pub use knn::{DistanceMetric, KNNConfig, KNNRegressor, WeightScheme};
pub use linear_models::{LassoRegression, LinearRegression, RidgeRegression};
pub use random_forest::{MaxFeatures, RandomForestRegressor};
pub use registry::{default_candidates, default_search_spaces};
