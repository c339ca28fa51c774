//! One-hot categorical encoding

use crate::error::{Result, ScoreError};
use super::read_categorical;
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One-hot encoder with one indicator column per category seen at fit time.
///
/// Vocabularies are sorted so the output layout depends only on the set of
/// categories, never on row order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Encoder {
    vocabularies: Vec<(String, Vec<String>)>,
    is_fitted: bool,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Categories learned for `column`
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.vocabularies
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v.as_slice())
    }

    /// Fit the encoder; nulls are not part of any vocabulary
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        let mut vocabularies = Vec::with_capacity(columns.len());
        for col_name in columns {
            let vocab: BTreeSet<String> = read_categorical(df, col_name)?
                .into_iter()
                .flatten()
                .collect();
            vocabularies.push((col_name.to_string(), vocab.into_iter().collect()));
        }

        self.vocabularies = vocabularies;
        self.is_fitted = true;
        Ok(self)
    }

    /// Number of output columns produced by `transform`
    pub fn n_outputs(&self) -> usize {
        self.vocabularies.iter().map(|(_, v)| v.len()).sum()
    }

    /// Output column names, e.g. `lunch_standard`
    pub fn feature_names(&self) -> Vec<String> {
        self.vocabularies
            .iter()
            .flat_map(|(col, vocab)| vocab.iter().map(move |cat| format!("{}_{}", col, cat)))
            .collect()
    }

    /// Encode the fitted columns into a dense block, one block per column in
    /// fit order.
    ///
    /// A category outside the vocabulary (or a null) yields an all-zero
    /// block.
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(ScoreError::ModelNotFitted);
        }

        let n_rows = df.height();
        let mut out = Array2::zeros((n_rows, self.n_outputs()));
        let mut offset = 0;

        for (col_name, vocab) in &self.vocabularies {
            let values = read_categorical(df, col_name)?;
            for (row, value) in values.iter().enumerate() {
                let idx = value
                    .as_deref()
                    .and_then(|v| vocab.binary_search_by(|c| c.as_str().cmp(v)).ok());
                if let Some(i) = idx {
                    out[[row, offset + i]] = 1.0;
                }
            }
            offset += vocab.len();
        }

        Ok(out)
    }

    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<Array2<f64>> {
        self.fit(df, columns)?;
        self.transform(df)
    }
}
