//! Inference
//!
//! Turns caller-supplied fields into a validated [`FeatureRow`], then applies
//! the persisted preprocessor and estimator held by a [`PredictionService`].

mod request;
mod service;

pub use request::{clamp_score, FeatureRow, PredictionRequest, RawScore, SCORE_RANGE};
pub use service::{LoadedPipeline, PredictionService};
