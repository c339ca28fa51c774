//! Composed preprocessing transform

use crate::error::{Result, ScoreError};
use super::{
    check_columns,
    config::FeatureSpec,
    encoder::Encoder,
    imputer::Imputer,
    read_numeric,
    scaler::Scaler,
};
use ndarray::{concatenate, Array1, Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Builds unfitted [`Preprocessor`]s
#[derive(Debug, Clone, Default)]
pub struct PreprocessorBuilder;

impl PreprocessorBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Construct an unfitted preprocessor for `spec`: median imputation and
    /// standard scaling for numeric columns, most-frequent imputation and
    /// one-hot encoding for categorical ones
    pub fn build(&self, spec: FeatureSpec) -> Result<Preprocessor> {
        spec.validate()?;
        Ok(Preprocessor {
            numeric_imputer: Imputer::new(),
            categorical_imputer: Imputer::new(),
            scaler: Scaler::new(),
            encoder: Encoder::new(),
            spec,
            feature_names: Vec::new(),
            is_fitted: false,
        })
    }
}

/// Fit-once feature transform.
///
/// Output columns are the scaled numeric features in spec order followed by
/// the encoded categorical blocks in spec order. After `fit` the state is
/// frozen and `transform` only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preprocessor {
    spec: FeatureSpec,
    numeric_imputer: Imputer,
    categorical_imputer: Imputer,
    scaler: Scaler,
    encoder: Encoder,
    feature_names: Vec<String>,
    is_fitted: bool,
}

impl Preprocessor {
    pub fn spec(&self) -> &FeatureSpec {
        &self.spec
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Names of the output columns, available after fit
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Learn medians, scales and vocabularies from the training table
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        if self.is_fitted {
            return Err(ScoreError::ConfigError(
                "preprocessor is already fitted and cannot be refit".to_string(),
            ));
        }
        let start = Instant::now();
        check_columns(df, &self.spec.input_columns())?;
        if df.height() == 0 {
            return Err(ScoreError::DataShapeError("cannot fit on an empty table".to_string()));
        }

        let numeric: Vec<&str> = self.spec.numeric_columns.iter().map(String::as_str).collect();
        let categorical: Vec<&str> = self.spec.categorical_columns.iter().map(String::as_str).collect();

        self.numeric_imputer.fit_numeric(df, &numeric)?;
        let imputed = self.numeric_imputer.transform(df)?;
        self.scaler.fit(&imputed, &numeric)?;

        self.categorical_imputer.fit_categorical(df, &categorical)?;
        let imputed = self.categorical_imputer.transform(df)?;
        self.encoder.fit(&imputed, &categorical)?;

        self.feature_names = self
            .spec
            .numeric_columns
            .iter()
            .cloned()
            .chain(self.encoder.feature_names())
            .collect();
        self.is_fitted = true;

        debug!(
            rows = df.height(),
            features = self.feature_names.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fitted preprocessor"
        );
        Ok(self)
    }

    /// Fit on `df` and return its transformed matrix
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<Array2<f64>> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Apply the frozen statistics to `df`
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(ScoreError::ModelNotFitted);
        }
        check_columns(df, &self.spec.input_columns())?;

        let numeric = self.numeric_block(df)?;
        let imputed = self.categorical_imputer.transform(df)?;
        let categorical = self.encoder.transform(&imputed)?;

        Ok(concatenate![Axis(1), numeric, categorical])
    }

    /// Extract the target column as a vector; nulls are rejected
    pub fn target(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let name = &self.spec.target_column;
        let values = read_numeric(df, name)?;
        values
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                v.ok_or_else(|| {
                    ScoreError::DataShapeError(format!(
                        "target column '{}' is missing a value at row {}",
                        name, row
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()
            .map(Array1::from)
    }

    fn numeric_block(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let imputed = self.numeric_imputer.transform(df)?;
        let scaled = self.scaler.transform(&imputed)?;

        let columns = self
            .spec
            .numeric_columns
            .iter()
            .map(|name| {
                Ok(read_numeric(&scaled, name)?
                    .into_iter()
                    .map(|v| v.unwrap_or(0.0))
                    .collect::<Vec<f64>>())
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Array2::from_shape_fn((df.height(), columns.len()), |(i, j)| {
            columns[j][i]
        }))
    }
}
