//! Feature specification

use crate::error::{Result, ScoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Canonical column order of a single inference row.
///
/// The row builder and the default [`FeatureSpec`] both derive from this list.
pub const FEATURE_ORDER: [&str; 7] = [
    "gender",
    "race_ethnicity",
    "parental_level_of_education",
    "lunch",
    "test_preparation_course",
    "reading_score",
    "writing_score",
];

/// Target column of the student performance dataset
pub const TARGET_COLUMN: &str = "math_score";

/// Which columns are numeric, which are categorical, and what is predicted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub target_column: String,
}

impl FeatureSpec {
    /// Create and validate a spec
    pub fn new(
        numeric_columns: Vec<String>,
        categorical_columns: Vec<String>,
        target_column: impl Into<String>,
    ) -> Result<Self> {
        let spec = Self {
            numeric_columns,
            categorical_columns,
            target_column: target_column.into(),
        };
        spec.validate()?;
        Ok(spec)
    }

    /// The student performance layout: five categorical fields, two scores,
    /// predicting `math_score`
    pub fn student_performance() -> Self {
        Self {
            numeric_columns: FEATURE_ORDER[5..].iter().map(|s| s.to_string()).collect(),
            categorical_columns: FEATURE_ORDER[..5].iter().map(|s| s.to_string()).collect(),
            target_column: TARGET_COLUMN.to_string(),
        }
    }

    /// Check the column lists are disjoint, duplicate-free and exclude the target
    pub fn validate(&self) -> Result<()> {
        if self.target_column.trim().is_empty() {
            return Err(ScoreError::ConfigError("target column must not be empty".to_string()));
        }
        if self.numeric_columns.is_empty() && self.categorical_columns.is_empty() {
            return Err(ScoreError::ConfigError("feature spec has no feature columns".to_string()));
        }

        let mut seen = HashSet::new();
        for col in self.numeric_columns.iter().chain(&self.categorical_columns) {
            if col == &self.target_column {
                return Err(ScoreError::ConfigError(format!(
                    "target column '{}' is listed as a feature",
                    col
                )));
            }
            if !seen.insert(col.as_str()) {
                return Err(ScoreError::ConfigError(format!(
                    "column '{}' is listed more than once",
                    col
                )));
            }
        }
        Ok(())
    }

    /// Feature columns, categorical first then numeric
    pub fn input_columns(&self) -> Vec<&str> {
        self.categorical_columns
            .iter()
            .chain(&self.numeric_columns)
            .map(String::as_str)
            .collect()
    }

    pub fn n_inputs(&self) -> usize {
        self.numeric_columns.len() + self.categorical_columns.len()
    }
}

impl Default for FeatureSpec {
    fn default() -> Self {
        Self::student_performance()
    }
}
