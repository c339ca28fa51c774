//! Load-once prediction service

use super::request::{clamp_score, FeatureRow, PredictionRequest};
use crate::error::{Result, ScoreError};
use crate::export::{ArtifactPaths, ArtifactStore};
use crate::preprocessing::{Preprocessor, FEATURE_ORDER};
use crate::training::{Estimator, Regressor};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// The frozen preprocessor and estimator, read-only once loaded
#[derive(Debug)]
pub struct LoadedPipeline {
    preprocessor: Preprocessor,
    model: Regressor,
}

impl LoadedPipeline {
    pub fn new(preprocessor: Preprocessor, model: Regressor) -> Result<Self> {
        if !preprocessor.is_fitted() {
            return Err(ScoreError::ConfigError("preprocessor has not been fitted".to_string()));
        }
        if let Some(column) = preprocessor
            .spec()
            .input_columns()
            .into_iter()
            .find(|c| !FEATURE_ORDER.contains(c))
        {
            return Err(ScoreError::ConfigError(format!(
                "preprocessor expects column '{}' which prediction requests do not provide",
                column
            )));
        }
        Ok(Self { preprocessor, model })
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn model(&self) -> &Regressor {
        &self.model
    }

    /// Unclamped model output for one row
    pub fn predict_raw(&self, row: &FeatureRow) -> Result<f64> {
        let df = row.to_dataframe()?;
        let x = self.preprocessor.transform(&df)?;
        let prediction = self.model.predict(&x)?;
        match prediction.first() {
            Some(value) if value.is_finite() => Ok(*value),
            Some(value) => Err(ScoreError::ComputationError(format!(
                "model produced a non-finite prediction: {}",
                value
            ))),
            None => Err(ScoreError::ComputationError("model returned no prediction".to_string())),
        }
    }

    /// Prediction clamped to the score domain
    pub fn predict(&self, row: &FeatureRow) -> Result<f64> {
        self.predict_raw(row).map(clamp_score)
    }
}

/// Serves single-row predictions from persisted artifacts.
///
/// Artifacts are loaded on first use and then shared by every caller until
/// [`reset`](Self::reset) or [`reload`](Self::reload). Concurrent first
/// callers trigger exactly one load.
#[derive(Debug)]
pub struct PredictionService {
    store: ArtifactStore,
    loaded: RwLock<Option<Arc<LoadedPipeline>>>,
    load_guard: Mutex<()>,
    load_count: AtomicUsize,
}

impl PredictionService {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            store: ArtifactStore::new(paths),
            loaded: RwLock::new(None),
            load_guard: Mutex::new(()),
            load_count: AtomicUsize::new(0),
        }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        self.store.paths()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.read().is_some()
    }

    /// Number of times artifacts have been read from disk
    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }

    /// The loaded pipeline, loading it if this is the first call
    pub fn pipeline(&self) -> Result<Arc<LoadedPipeline>> {
        if let Some(pipeline) = self.loaded.read().as_ref() {
            return Ok(Arc::clone(pipeline));
        }

        let _guard = self.load_guard.lock();
        // another caller may have finished loading while we waited
        if let Some(pipeline) = self.loaded.read().as_ref() {
            return Ok(Arc::clone(pipeline));
        }
        let pipeline = self.load_from_store()?;
        *self.loaded.write() = Some(Arc::clone(&pipeline));
        Ok(pipeline)
    }

    /// Validate `request` and predict; invalid input never reaches the model
    pub fn predict_request(&self, request: &PredictionRequest) -> Result<f64> {
        let row = request.validate()?;
        self.predict(&row)
    }

    /// Predicted score in [0, 100]
    pub fn predict(&self, row: &FeatureRow) -> Result<f64> {
        let score = self.pipeline()?.predict(row)?;
        debug!(score, "Prediction served");
        Ok(score)
    }

    /// Drop the cached artifacts; the next prediction loads them again
    pub fn reset(&self) {
        let _guard = self.load_guard.lock();
        *self.loaded.write() = None;
        info!("Prediction service reset");
    }

    /// Load fresh artifacts and swap them in. On failure the previous
    /// pipeline stays in place.
    pub fn reload(&self) -> Result<Arc<LoadedPipeline>> {
        let _guard = self.load_guard.lock();
        let pipeline = self.load_from_store()?;
        *self.loaded.write() = Some(Arc::clone(&pipeline));
        Ok(pipeline)
    }

    fn load_from_store(&self) -> Result<Arc<LoadedPipeline>> {
        let start = Instant::now();
        let (preprocessor, model) = self.store.load()?;
        let pipeline = Arc::new(LoadedPipeline::new(preprocessor, model)?);
        let count = self.load_count.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            preprocessor = %self.store.paths().preprocessor.display(),
            model = %self.store.paths().model.display(),
            estimator = pipeline.model().kind(),
            load_count = count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Prediction artifacts loaded"
        );
        Ok(pipeline)
    }
}
