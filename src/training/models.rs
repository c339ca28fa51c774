//! Estimator capability trait and the R² metric

use crate::error::{Result, ScoreError};
use crate::optimizer::ParamValue;
use ndarray::{Array1, Array2};

/// Coefficient of determination.
///
/// A constant target scores 1.0 when predicted exactly and 0.0 otherwise.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let n = y_true.len() as f64;
    if y_true.is_empty() {
        return 0.0;
    }
    let y_mean = y_true.sum() / n;
    let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();

    if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Capability every model family implements.
///
/// The search engine only talks to estimators through this trait: it clones
/// a template, applies hyperparameters by name, fits and predicts.
pub trait Estimator: Clone + Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Make predictions
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Set one hyperparameter by name
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()>;

    /// Score predictions on `(x, y)` with R²
    fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let pred = self.predict(x)?;
        Ok(r2_score(y, &pred))
    }
}

/// Check `x` and `y` agree on the number of samples and are non-empty
pub(crate) fn check_training_data(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(ScoreError::ShapeError {
            expected: format!("{} targets", x.nrows()),
            actual: format!("{} targets", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(ScoreError::DataShapeError("cannot fit on zero samples".to_string()));
    }
    Ok(())
}

/// Check `x` has the feature count the model was fitted with
pub(crate) fn check_features(expected: usize, x: &Array2<f64>) -> Result<()> {
    if x.ncols() != expected {
        return Err(ScoreError::ShapeError {
            expected: format!("{} features", expected),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}

pub(crate) fn unknown_param(family: &str, name: &str, value: &ParamValue) -> ScoreError {
    ScoreError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: format!("not a hyperparameter of {}", family),
    }
}

pub(crate) fn bad_param(name: &str, value: &ParamValue, reason: &str) -> ScoreError {
    ScoreError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Non-negative float hyperparameter
pub(crate) fn non_negative_f64(name: &str, value: &ParamValue) -> Result<f64> {
    match value.as_f64() {
        Some(v) if v >= 0.0 && v.is_finite() => Ok(v),
        _ => Err(bad_param(name, value, "expected a non-negative number")),
    }
}

/// Float hyperparameter in (0, 1]
pub(crate) fn unit_fraction(name: &str, value: &ParamValue) -> Result<f64> {
    match value.as_f64() {
        Some(v) if v > 0.0 && v <= 1.0 => Ok(v),
        _ => Err(bad_param(name, value, "expected a number in (0, 1]")),
    }
}

/// Integer hyperparameter of at least `min`
pub(crate) fn usize_at_least(name: &str, value: &ParamValue, min: usize) -> Result<usize> {
    match value.as_usize() {
        Some(v) if v >= min => Ok(v),
        _ => Err(bad_param(name, value, &format!("expected an integer >= {}", min))),
    }
}

/// Integer hyperparameter of at least 1, or unset
pub(crate) fn optional_depth(name: &str, value: &ParamValue) -> Result<Option<usize>> {
    if value.is_unset() {
        return Ok(None);
    }
    usize_at_least(name, value, 1).map(Some)
}

pub(crate) fn bool_param(name: &str, value: &ParamValue) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| bad_param(name, value, "expected a boolean"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_r2_of_mean_prediction_is_zero() {
        let y = array![1.0, 2.0, 3.0];
        let pred = array![2.0, 2.0, 2.0];
        assert!(r2_score(&y, &pred).abs() < 1e-12);
    }

    #[test]
    fn test_r2_constant_target() {
        let y = array![3.0, 3.0];
        assert_eq!(r2_score(&y, &array![3.0, 3.0]), 1.0);
        assert_eq!(r2_score(&y, &array![2.0, 3.0]), 0.0);
    }

    #[test]
    fn test_shape_checks() {
        let x = Array2::<f64>::zeros((3, 2));
        assert!(check_training_data(&x, &array![1.0, 2.0]).is_err());
        assert!(check_features(3, &x).is_err());
        assert!(check_features(2, &x).is_ok());
    }
}
