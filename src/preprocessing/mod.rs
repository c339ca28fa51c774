//! Data preprocessing module
//!
//! Turns a raw student table into the numeric matrix the estimators consume:
//! - Missing value imputation (median for scores, most frequent for categories)
//! - Zero-mean, unit-variance scaling of numeric features
//! - One-hot encoding that tolerates categories unseen at fit time
//!
//! The composed [`Preprocessor`] is fitted once on the training split and then
//! applied unchanged to the held-out split and to inference rows.

mod config;
mod encoder;
mod imputer;
mod pipeline;
mod scaler;

pub use config::{FeatureSpec, FEATURE_ORDER, TARGET_COLUMN};
pub use encoder::Encoder;
pub use imputer::{ImputeValue, Imputer};
pub use pipeline::{Preprocessor, PreprocessorBuilder};
pub use scaler::{Scaler, ScalerParams};

use crate::error::{Result, ScoreError};
use polars::prelude::*;

/// Whether a column dtype can be read as f64
pub(crate) fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
            | DataType::Null
    )
}

fn missing_column(name: &str) -> ScoreError {
    ScoreError::DataShapeError(format!("required column '{}' is missing", name))
}

/// Read a numeric column as f64, treating nulls and NaN as missing
pub(crate) fn read_numeric(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name).map_err(|_| missing_column(name))?;
    if !is_numeric_dtype(column.dtype()) {
        return Err(ScoreError::DataShapeError(format!(
            "column '{}' must be numeric, found {}",
            name,
            column.dtype()
        )));
    }

    let casted = column.cast(&DataType::Float64)?;
    let values = casted
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect();
    Ok(values)
}

/// Read a categorical column as strings; non-string columns are cast
pub(crate) fn read_categorical(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name).map_err(|_| missing_column(name))?;
    let casted = match column.dtype() {
        DataType::String => column.clone(),
        _ => column.cast(&DataType::String)?,
    };

    let values = casted
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

/// Fail with a single error naming every column of `required` absent from `df`
pub(crate) fn check_columns(df: &DataFrame, required: &[&str]) -> Result<()> {
    let present = df.get_column_names();
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|c| !present.iter().any(|p| p.as_str() == *c))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ScoreError::DataShapeError(format!(
            "missing required columns: {}",
            missing.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_numeric_casts_integers() {
        let df = DataFrame::new(vec![Column::new("a".into(), &[1i64, 2, 3])]).unwrap();
        assert_eq!(read_numeric(&df, "a").unwrap(), vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_read_numeric_nan_is_missing() {
        let df = DataFrame::new(vec![Column::new("a".into(), &[1.0, f64::NAN])]).unwrap();
        assert_eq!(read_numeric(&df, "a").unwrap(), vec![Some(1.0), None]);
    }

    #[test]
    fn test_read_numeric_rejects_strings() {
        let df = DataFrame::new(vec![Column::new("a".into(), &["x"])]).unwrap();
        assert!(matches!(read_numeric(&df, "a"), Err(ScoreError::DataShapeError(_))));
    }

    #[test]
    fn test_check_columns_lists_all_missing() {
        let df = DataFrame::new(vec![Column::new("a".into(), &[1.0])]).unwrap();
        let err = check_columns(&df, &["a", "b", "c"]).unwrap_err();
        assert!(err.to_string().contains("b, c"));
    }
}
