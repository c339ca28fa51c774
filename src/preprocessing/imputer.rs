//! Missing value imputation strategies

use crate::error::{Result, ScoreError};
use super::{read_categorical, read_numeric};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Learned fill value for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeValue {
    Numeric(f64),
    String(String),
}

/// Imputer for handling missing values: the training median for numeric
/// columns, the most frequent category for categorical ones.
///
/// Fill values are kept in fit order so the learned state is independent of
/// hash ordering and survives serialization unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Imputer {
    fill_values: Vec<(String, ImputeValue)>,
    is_fitted: bool,
}

impl Imputer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Learned fill value for `column`
    pub fn fill_value(&self, column: &str) -> Option<&ImputeValue> {
        self.fill_values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }

    /// Fit numeric columns with their medians
    pub fn fit_numeric(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        let mut fill_values = Vec::with_capacity(columns.len());
        for col_name in columns {
            let values = read_numeric(df, col_name)?;
            let fill = numeric_fill_value(col_name, &values)?;
            fill_values.push((col_name.to_string(), fill));
        }

        self.fill_values = fill_values;
        self.is_fitted = true;
        Ok(self)
    }

    /// Fit categorical columns with their modes
    pub fn fit_categorical(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        let mut fill_values = Vec::with_capacity(columns.len());
        for col_name in columns {
            let values = read_categorical(df, col_name)?;
            let fill = categorical_fill_value(col_name, &values)?;
            fill_values.push((col_name.to_string(), fill));
        }

        self.fill_values = fill_values;
        self.is_fitted = true;
        Ok(self)
    }

    /// Transform the data by imputing missing values.
    ///
    /// Every fitted column must be present; other columns pass through.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ScoreError::ModelNotFitted);
        }

        let mut result = df.clone();
        for (col_name, fill_value) in &self.fill_values {
            let filled = self.fill_column(df, col_name, fill_value)?;
            result.with_column(filled)?;
        }

        Ok(result)
    }

    fn fill_column(&self, df: &DataFrame, col_name: &str, fill_value: &ImputeValue) -> Result<Series> {
        match fill_value {
            ImputeValue::Numeric(val) => {
                let filled: Float64Chunked = read_numeric(df, col_name)?
                    .into_iter()
                    .map(|opt| Some(opt.unwrap_or(*val)))
                    .collect();
                Ok(filled.with_name(col_name.into()).into_series())
            }
            ImputeValue::String(val) => {
                let filled: StringChunked = read_categorical(df, col_name)?
                    .into_iter()
                    .map(|opt| Some(opt.unwrap_or_else(|| val.clone())))
                    .collect();
                Ok(filled.with_name(col_name.into()).into_series())
            }
        }
    }
}

fn numeric_fill_value(col_name: &str, values: &[Option<f64>]) -> Result<ImputeValue> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    median(&present).map(ImputeValue::Numeric).ok_or_else(|| {
        ScoreError::DataShapeError(format!(
            "numeric column '{}' has no observed values to impute from",
            col_name
        ))
    })
}

fn categorical_fill_value(col_name: &str, values: &[Option<String>]) -> Result<ImputeValue> {
    most_frequent(values.iter().flatten())
        .map(ImputeValue::String)
        .ok_or_else(|| {
            ScoreError::DataShapeError(format!(
                "categorical column '{}' has no observed values to impute from",
                col_name
            ))
        })
}

/// Median with linear interpolation between the two middle values
pub(crate) fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Mode; ties resolve to the lexicographically smallest category
fn most_frequent<'a>(values: impl Iterator<Item = &'a String>) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for val in values {
        *counts.entry(val.as_str()).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(v, _)| v.to_string())
}
