//! Zero-mean, unit-variance scaling

use crate::error::{Result, ScoreError};
use super::read_numeric;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Parameters for a fitted scaler
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    /// Training mean
    pub center: f64,
    /// Population standard deviation, 1 for a constant column
    pub scale: f64,
}

/// Standard scaler: `(x - mean) / std`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scaler {
    params: Vec<(String, ScalerParams)>,
    is_fitted: bool,
}

impl Scaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Fitted parameters for `column`
    pub fn params(&self, column: &str) -> Option<ScalerParams> {
        self.params
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, p)| *p)
    }

    /// Fit the scaler to the data. Columns must already be imputed.
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        let mut params = Vec::with_capacity(columns.len());
        for col_name in columns {
            let values: Vec<f64> = read_numeric(df, col_name)?.into_iter().flatten().collect();
            if values.is_empty() {
                return Err(ScoreError::DataShapeError(format!(
                    "cannot fit scaler on empty column '{}'",
                    col_name
                )));
            }
            params.push((col_name.to_string(), standard_params(&values)));
        }

        self.params = params;
        self.is_fitted = true;
        Ok(self)
    }

    /// Transform the data
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ScoreError::ModelNotFitted);
        }

        let mut result = df.clone();
        for (col_name, params) in &self.params {
            let scaled: Float64Chunked = read_numeric(df, col_name)?
                .into_iter()
                .map(|opt| opt.map(|v| (v - params.center) / params.scale))
                .collect();
            result.with_column(scaled.with_name(col_name.as_str().into()).into_series())?;
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }
}

fn standard_params(values: &[f64]) -> ScalerParams {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();
    ScalerParams {
        center: mean,
        scale: if std == 0.0 { 1.0 } else { std },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        DataFrame::new(vec![
            Column::new("a".into(), &[1.0, 2.0, 3.0, 4.0, 5.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_standard_scaler() {
        let mut scaler = Scaler::new();
        let result = scaler.fit_transform(&sample(), &["a"]).unwrap();

        let col = result.column("a").unwrap().f64().unwrap();
        let values: Vec<f64> = col.into_iter().flatten().collect();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        assert!(mean.abs() < 1e-10);
        assert!((var - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_standard_scaler_uses_population_std() {
        let mut scaler = Scaler::new();
        scaler.fit(&sample(), &["a"]).unwrap();
        let params = scaler.params("a").unwrap();
        assert_eq!(params.center, 3.0);
        assert!((params.scale - 2.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column_keeps_unit_scale() {
        let df = DataFrame::new(vec![Column::new("a".into(), &[7.0, 7.0, 7.0])]).unwrap();
        let mut scaler = Scaler::new();
        let result = scaler.fit_transform(&df, &["a"]).unwrap();
        let col = result.column("a").unwrap().f64().unwrap();
        assert_eq!(col.get(0), Some(0.0));
    }

    #[test]
    fn test_transform_before_fit() {
        let scaler = Scaler::new();
        assert!(matches!(scaler.transform(&sample()), Err(ScoreError::ModelNotFitted)));
    }
}
