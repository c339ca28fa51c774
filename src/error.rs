//! Error types for the student score pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ScoreError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum ScoreError {
    /// Invalid feature spec or search configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Missing or malformed columns in a table
    #[error("Data shape error: {0}")]
    DataShapeError(String),

    /// Caller input rejected at the inference boundary
    #[error("{0}")]
    Validation(ValidationError),

    #[error("Artifact not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    #[error("Corrupt artifact at {}: {reason}", path.display())]
    CorruptArtifact { path: PathBuf, reason: String },

    /// A model family failed to fit or search; aborts the whole run
    #[error("Search failed for model family '{family}': {source}")]
    SearchFailure {
        family: String,
        #[source]
        source: Box<ScoreError>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Computation error: {0}")]
    ComputationError(String),
}

impl ScoreError {
    /// Wrap an error raised while fitting or searching a model family
    pub fn search_failure(family: impl Into<String>, source: ScoreError) -> Self {
        ScoreError::SearchFailure {
            family: family.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error is meant to be shown to an end user as-is
    pub fn is_user_facing(&self) -> bool {
        matches!(self, ScoreError::Validation(_))
    }
}

impl From<ValidationError> for ScoreError {
    fn from(err: ValidationError) -> Self {
        ScoreError::Validation(err)
    }
}

impl From<polars::error::PolarsError> for ScoreError {
    fn from(err: polars::error::PolarsError) -> Self {
        ScoreError::DataShapeError(err.to_string())
    }
}

impl From<serde_json::Error> for ScoreError {
    fn from(err: serde_json::Error) -> Self {
        ScoreError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ScoreError {
    fn from(err: ndarray::ShapeError) -> Self {
        ScoreError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

/// What is wrong with a single input field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldProblem {
    /// Field absent from the request
    Missing,
    /// Field present but blank
    Empty,
    /// Score field that does not parse as a number
    NotNumeric(String),
    /// Score outside the closed range [min, max]
    OutOfRange { value: f64, min: f64, max: f64 },
}

impl fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldProblem::Missing => write!(f, "is required"),
            FieldProblem::Empty => write!(f, "must not be empty"),
            FieldProblem::NotNumeric(raw) => write!(f, "must be a number, got '{}'", raw),
            FieldProblem::OutOfRange { value, min, max } => {
                write!(f, "must be between {} and {}, got {}", min, max, value)
            }
        }
    }
}

/// One offending field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub problem: FieldProblem,
}

impl FieldError {
    pub fn new(field: impl Into<String>, problem: FieldProblem) -> Self {
        Self {
            field: field.into(),
            problem,
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.problem)
    }
}

/// Every field problem found in one request, in canonical field order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, problem: FieldProblem) {
        self.errors.push(FieldError::new(field, problem));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Problems reported for `field`
    pub fn problems_for(&self, field: &str) -> Vec<&FieldProblem> {
        self.errors
            .iter()
            .filter(|e| e.field == field)
            .map(|e| &e.problem)
            .collect()
    }

    /// Names of the offending fields
    pub fn fields(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.field.as_str()).collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation error: ")?;
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
