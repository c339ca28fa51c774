//! Student score - math score regression for student performance data
//!
//! This crate trains a tabular regressor from categorical and numeric student
//! features and serves single-row predictions from the persisted result.
//!
//! # Modules
//!
//! - [`preprocessing`] - Leakage-safe imputation, scaling and one-hot encoding
//! - [`training`] - Regressors, cross-validation and the training pipeline
//! - [`optimizer`] - Per-family hyperparameter search and the leaderboard
//! - [`export`] - Atomic artifact persistence
//! - [`inference`] - Request validation and the load-once prediction service
//! - [`utils`] - CSV ingestion and the seeded train/held-out split
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use student_score::inference::{PredictionRequest, PredictionService};
//! use student_score::training::{TrainingConfig, TrainingPipeline};
//!
//! let config = TrainingConfig::default();
//! let report = TrainingPipeline::new(config.clone())?.run_csv("data/stud.csv")?;
//! println!("{}", report);
//!
//! let service = PredictionService::new(config.artifacts);
//! let request = PredictionRequest::from_fields([
//!     ("gender", "female"),
//!     ("race_ethnicity", "group B"),
//!     ("parental_level_of_education", "bachelor's degree"),
//!     ("lunch", "standard"),
//!     ("test_preparation_course", "none"),
//!     ("reading_score", "72"),
//!     ("writing_score", "74"),
//! ]);
//! let score = service.predict_request(&request)?;
//! # Ok::<(), student_score::error::ScoreError>(())
//! ```

pub mod error;

pub mod preprocessing;
pub mod training;
pub mod optimizer;
pub mod export;
pub mod inference;
pub mod utils;

pub mod cli;

pub use error::{Result, ScoreError};
