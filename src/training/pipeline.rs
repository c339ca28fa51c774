//! End-to-end training run: preprocess, search, gate, persist

use super::config::TrainingConfig;
use super::engine::Regressor;
use super::registry::{default_candidates, default_search_spaces};
use crate::error::{Result, ScoreError};
use crate::export::{ArtifactPaths, ArtifactStore};
use crate::optimizer::{Leaderboard, ParamSet, SearchEngine, SearchSpace};
use crate::preprocessing::PreprocessorBuilder;
use crate::utils::{load_csv, snapshot_splits, train_test_split};
use polars::prelude::DataFrame;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// What a successful training run produced
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub leaderboard: Leaderboard<Regressor>,
    pub best_family: String,
    /// Held-out R² of the persisted estimator
    pub best_score: f64,
    pub best_params: BTreeMap<String, ParamSet>,
    pub artifacts: ArtifactPaths,
    pub n_train: usize,
    pub n_held_out: usize,
    pub n_features: usize,
    pub elapsed_secs: f64,
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.leaderboard)?;
        writeln!(
            f,
            "Best model: {} (held-out R² {:.4}) trained on {} rows x {} features in {:.1}s",
            self.best_family, self.best_score, self.n_train, self.n_features, self.elapsed_secs
        )
    }
}

/// Runs a full training job with a fixed set of model families
#[derive(Debug, Clone)]
pub struct TrainingPipeline {
    config: TrainingConfig,
    candidates: Vec<(String, Regressor)>,
    spaces: BTreeMap<String, SearchSpace>,
}

impl TrainingPipeline {
    /// Pipeline over the default model families and grids
    pub fn new(config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            candidates: default_candidates(),
            spaces: default_search_spaces(),
        })
    }

    pub fn with_candidates(mut self, candidates: Vec<(String, Regressor)>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn with_search_spaces(mut self, spaces: BTreeMap<String, SearchSpace>) -> Self {
        self.spaces = spaces;
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Load `path`, split it and train
    pub fn run_csv(&self, path: impl AsRef<Path>) -> Result<TrainingReport> {
        let raw = load_csv(path)?;
        let (train, held_out) = train_test_split(&raw, &self.config.split)?;
        if let Some(dir) = &self.config.snapshot_dir {
            snapshot_splits(dir, &raw, &train, &held_out)?;
        }
        self.run(&train, &held_out)
    }

    /// Fit the preprocessor on `train`, search every family, and persist the
    /// winner. Nothing is written if any step fails.
    pub fn run(&self, train: &DataFrame, held_out: &DataFrame) -> Result<TrainingReport> {
        let start = Instant::now();

        let mut preprocessor = PreprocessorBuilder::new().build(self.config.spec.clone())?;
        let x_train = preprocessor.fit_transform(train)?;
        let y_train = preprocessor.target(train)?;
        let x_held = preprocessor.transform(held_out)?;
        let y_held = preprocessor.target(held_out)?;
        info!(
            n_train = x_train.nrows(),
            n_held_out = x_held.nrows(),
            n_features = x_train.ncols(),
            "Preprocessed training data"
        );

        let engine = SearchEngine::new(self.config.search.clone())?;
        let outcome = engine.evaluate(
            &x_train,
            &y_train,
            &x_held,
            &y_held,
            &self.candidates,
            &self.spaces,
        )?;

        let best_score = outcome.best_score();
        if !(best_score >= self.config.min_best_score) {
            warn!(
                best_family = %outcome.best_family,
                best_score,
                min_best_score = self.config.min_best_score,
                "Best model below quality gate, nothing persisted"
            );
            return Err(ScoreError::search_failure(
                outcome.best_family.clone(),
                ScoreError::ComputationError(format!(
                    "best held-out R² {:.4} is below the minimum {:.4}",
                    best_score, self.config.min_best_score
                )),
            ));
        }

        ArtifactStore::new(self.config.artifacts.clone()).save(&preprocessor, &outcome.best_estimator)?;

        let report = TrainingReport {
            best_family: outcome.best_family,
            best_score,
            best_params: outcome.best_params,
            leaderboard: outcome.leaderboard,
            artifacts: self.config.artifacts.clone(),
            n_train: x_train.nrows(),
            n_held_out: x_held.nrows(),
            n_features: x_train.ncols(),
            elapsed_secs: start.elapsed().as_secs_f64(),
        };
        info!(
            best_family = %report.best_family,
            best_score = report.best_score,
            elapsed_secs = report.elapsed_secs,
            "Training run complete"
        );
        Ok(report)
    }
}
