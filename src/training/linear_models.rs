//! Linear regression models

use crate::error::{Result, ScoreError};
use crate::optimizer::ParamValue;
use super::models::{
    bool_param, check_features, check_training_data, non_negative_f64, unknown_param,
    usize_at_least, Estimator,
};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Solve the symmetric positive-definite system Ax = b by Cholesky decomposition
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    // A = L * L^T
    let mut l = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }

            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 || diag <= 1e-12 * a[[i, i]].abs() {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L * y = b
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T * x = y
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Solve (X^T X + alpha I) w = X^T y.
///
/// One-hot blocks make X^T X singular once the data is centered, so a
/// rank-deficient system is retried with a small diagonal jitter.
fn solve_normal_equations(x: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> Result<Array1<f64>> {
    let n_features = x.ncols();
    let mut xtx = x.t().dot(x);
    for i in 0..n_features {
        xtx[[i, i]] += alpha;
    }
    let xty = x.t().dot(y);

    if let Some(w) = cholesky_solve(&xtx, &xty) {
        return Ok(w);
    }

    let mean_diag = xtx.diag().iter().map(|v| v.abs()).sum::<f64>() / n_features.max(1) as f64;
    let mut jitter = 1e-8 * mean_diag.max(1e-8);
    for _ in 0..6 {
        let mut reg = xtx.clone();
        for i in 0..n_features {
            reg[[i, i]] += jitter;
        }
        if let Some(w) = cholesky_solve(&reg, &xty) {
            return Ok(w);
        }
        jitter *= 100.0;
    }

    Err(ScoreError::ComputationError(
        "normal equations are singular".to_string(),
    ))
}

/// Center columns of `x` and `y` when fitting an intercept
fn center(
    x: &Array2<f64>,
    y: &Array1<f64>,
    fit_intercept: bool,
) -> (Array2<f64>, Array1<f64>, Option<(Array1<f64>, f64)>) {
    if !fit_intercept {
        return (x.clone(), y.clone(), None);
    }
    let x_mean = x
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(x.ncols()));
    let y_mean = y.mean().unwrap_or(0.0);
    let x_centered = x - &x_mean.clone().insert_axis(Axis(0));
    let y_centered = y - y_mean;
    (x_centered, y_centered, Some((x_mean, y_mean)))
}

/// Coefficients and intercept of a fitted linear model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub coefficients: Array1<f64>,
    pub intercept: f64,
}

impl LinearFit {
    fn from_centered(coefficients: Array1<f64>, means: Option<(Array1<f64>, f64)>) -> Self {
        let intercept = match means {
            Some((x_mean, y_mean)) => y_mean - coefficients.dot(&x_mean),
            None => 0.0,
        };
        Self {
            coefficients,
            intercept,
        }
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_features(self.coefficients.len(), x)?;
        Ok(x.dot(&self.coefficients) + self.intercept)
    }
}

/// Ordinary least squares
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Whether to fit intercept
    pub fit_intercept: bool,
    fitted: Option<LinearFit>,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    pub fn new() -> Self {
        Self {
            fit_intercept: true,
            fitted: None,
        }
    }

    /// Enable/disable fitting intercept
    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn fitted(&self) -> Option<&LinearFit> {
        self.fitted.as_ref()
    }
}

impl Estimator for LinearRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        let (x_c, y_c, means) = center(x, y, self.fit_intercept);
        let w = solve_normal_equations(&x_c, &y_c, 0.0)?;
        self.fitted = Some(LinearFit::from_centered(w, means));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.fitted.as_ref().ok_or(ScoreError::ModelNotFitted)?.predict(x)
    }

    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "fit_intercept" => self.fit_intercept = bool_param(name, value)?,
            _ => return Err(unknown_param("LinearRegression", name, value)),
        }
        Ok(())
    }
}

/// L2-regularized least squares
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeRegression {
    /// L2 regularization strength
    pub alpha: f64,
    pub fit_intercept: bool,
    fitted: Option<LinearFit>,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            fit_intercept: true,
            fitted: None,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn fitted(&self) -> Option<&LinearFit> {
        self.fitted.as_ref()
    }
}

impl Estimator for RidgeRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        let (x_c, y_c, means) = center(x, y, self.fit_intercept);
        let w = solve_normal_equations(&x_c, &y_c, self.alpha)?;
        self.fitted = Some(LinearFit::from_centered(w, means));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.fitted.as_ref().ok_or(ScoreError::ModelNotFitted)?.predict(x)
    }

    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "alpha" => self.alpha = non_negative_f64(name, value)?,
            "fit_intercept" => self.fit_intercept = bool_param(name, value)?,
            _ => return Err(unknown_param("Ridge", name, value)),
        }
        Ok(())
    }
}

/// L1-regularized least squares, fitted by coordinate descent on
/// `(1 / 2n) ||y - Xw||^2 + alpha ||w||_1`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LassoRegression {
    /// L1 regularization strength
    pub alpha: f64,
    pub fit_intercept: bool,
    pub max_iter: usize,
    pub tol: f64,
    fitted: Option<LinearFit>,
}

impl Default for LassoRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl LassoRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            fit_intercept: true,
            max_iter: 1000,
            tol: 1e-6,
            fitted: None,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn fitted(&self) -> Option<&LinearFit> {
        self.fitted.as_ref()
    }

    /// Soft-threshold operator for the L1 proximal step
    fn soft_threshold(val: f64, threshold: f64) -> f64 {
        if val > threshold {
            val - threshold
        } else if val < -threshold {
            val + threshold
        } else {
            0.0
        }
    }
}

impl Estimator for LassoRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        let n_samples = x.nrows();
        let n_features = x.ncols();
        let (x_c, y_c, means) = center(x, y, self.fit_intercept);

        let col_norms: Vec<f64> = (0..n_features)
            .map(|j| x_c.column(j).mapv(|v| v * v).sum())
            .collect();

        let mut w = Array1::zeros(n_features);
        let lambda = self.alpha * n_samples as f64;
        let mut r = y_c.clone();

        for _ in 0..self.max_iter {
            let mut max_change = 0.0f64;
            for j in 0..n_features {
                if col_norms[j] < 1e-15 {
                    continue;
                }
                let rho = x_c.column(j).dot(&r) + col_norms[j] * w[j];
                let old = w[j];
                w[j] = Self::soft_threshold(rho, lambda) / col_norms[j];
                let delta = old - w[j];
                if delta != 0.0 {
                    r.scaled_add(delta, &x_c.column(j));
                    max_change = max_change.max(delta.abs());
                }
            }
            if max_change < self.tol {
                break;
            }
        }

        self.fitted = Some(LinearFit::from_centered(w, means));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.fitted.as_ref().ok_or(ScoreError::ModelNotFitted)?.predict(x)
    }

    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "alpha" => self.alpha = non_negative_f64(name, value)?,
            "fit_intercept" => self.fit_intercept = bool_param(name, value)?,
            "max_iter" => self.max_iter = usize_at_least(name, value, 1)?,
            _ => return Err(unknown_param("Lasso", name, value)),
        }
        Ok(())
    }
}
