//! The closed set of regressor families a training run can persist

use crate::error::Result;
use crate::optimizer::ParamValue;
use super::decision_tree::DecisionTreeRegressor;
use super::gradient_boosting::GradientBoostingRegressor;
use super::knn::KNNRegressor;
use super::linear_models::{LassoRegression, LinearRegression, RidgeRegression};
use super::models::Estimator;
use super::random_forest::RandomForestRegressor;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Any supported regressor; serialized as the winning estimator artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Regressor {
    LinearRegression(LinearRegression),
    Ridge(RidgeRegression),
    Lasso(LassoRegression),
    KNeighbors(KNNRegressor),
    DecisionTree(DecisionTreeRegressor),
    RandomForest(RandomForestRegressor),
    GradientBoosting(GradientBoostingRegressor),
}

macro_rules! dispatch {
    ($self:expr, $model:ident => $body:expr) => {
        match $self {
            Regressor::LinearRegression($model) => $body,
            Regressor::Ridge($model) => $body,
            Regressor::Lasso($model) => $body,
            Regressor::KNeighbors($model) => $body,
            Regressor::DecisionTree($model) => $body,
            Regressor::RandomForest($model) => $body,
            Regressor::GradientBoosting($model) => $body,
        }
    };
}

impl Regressor {
    /// Short name of the underlying algorithm
    pub fn kind(&self) -> &'static str {
        match self {
            Regressor::LinearRegression(_) => "linear_regression",
            Regressor::Ridge(_) => "ridge",
            Regressor::Lasso(_) => "lasso",
            Regressor::KNeighbors(_) => "k_neighbors",
            Regressor::DecisionTree(_) => "decision_tree",
            Regressor::RandomForest(_) => "random_forest",
            Regressor::GradientBoosting(_) => "gradient_boosting",
        }
    }
}

impl Estimator for Regressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        dispatch!(self, m => m.fit(x, y))
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        dispatch!(self, m => m.predict(x))
    }

    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        dispatch!(self, m => m.set_param(name, value))
    }
}

macro_rules! impl_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Regressor {
                fn from(model: $ty) -> Self {
                    Regressor::$variant(model)
                }
            }
        )*
    };
}

impl_from!(
    LinearRegression(LinearRegression),
    Ridge(RidgeRegression),
    Lasso(LassoRegression),
    KNeighbors(KNNRegressor),
    DecisionTree(DecisionTreeRegressor),
    RandomForest(RandomForestRegressor),
    GradientBoosting(GradientBoostingRegressor),
);
