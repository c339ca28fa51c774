//! Training run configuration

use crate::error::{Result, ScoreError};
use crate::export::ArtifactPaths;
use crate::optimizer::SearchConfig;
use crate::preprocessing::FeatureSpec;
use crate::utils::SplitConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Everything a training run needs besides the data.
///
/// Every field has a default, so a JSON file only lists what it overrides.
/// Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainingConfig {
    pub spec: FeatureSpec,
    pub search: SearchConfig,
    pub split: SplitConfig,
    pub artifacts: ArtifactPaths,

    /// Runs whose best held-out R² falls below this are rejected
    pub min_best_score: f64,

    /// Directory for raw/train/test CSV snapshots, if any
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            spec: FeatureSpec::default(),
            search: SearchConfig::default(),
            split: SplitConfig::default(),
            artifacts: ArtifactPaths::default(),
            min_best_score: 0.6,
            snapshot_dir: None,
        }
    }
}

impl TrainingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            ScoreError::ConfigError(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    pub fn with_split(mut self, split: SplitConfig) -> Self {
        self.split = split;
        self
    }

    pub fn with_artifacts(mut self, artifacts: ArtifactPaths) -> Self {
        self.artifacts = artifacts;
        self
    }

    pub fn with_min_best_score(mut self, min_best_score: f64) -> Self {
        self.min_best_score = min_best_score;
        self
    }

    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = Some(dir.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.spec.validate()?;
        self.search.validate()?;
        self.split.validate()?;
        if self.min_best_score.is_nan() || self.min_best_score > 1.0 {
            return Err(ScoreError::ConfigError(format!(
                "min_best_score must be a number <= 1, got {}",
                self.min_best_score
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = TrainingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_best_score, 0.6);
        assert_eq!(config.spec, FeatureSpec::student_performance());
    }

    #[test]
    fn test_partial_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"search": {{"cv_folds": 5, "seed": 7}}, "artifacts": {{"model": "out/m.bin"}}, "min_best_score": 0.5}}"#
        )
        .unwrap();

        let config = TrainingConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.search.cv_folds, 5);
        assert_eq!(config.search.seed, 7);
        assert_eq!(config.search.grid_limit, 60);
        assert_eq!(config.artifacts.model, PathBuf::from("out/m.bin"));
        assert_eq!(config.artifacts.preprocessor, PathBuf::from("artifacts/preprocessor.bin"));
        assert_eq!(config.min_best_score, 0.5);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"search": {{"cv_folds": 1}}}}"#).unwrap();
        assert!(matches!(
            TrainingConfig::from_json_file(file.path()),
            Err(ScoreError::ConfigError(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            TrainingConfig::from_json_file(file.path()),
            Err(ScoreError::ConfigError(_))
        ));
    }

    #[test]
    fn test_unknown_section_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"preprocessing": {{"scaler_type": "MinMax", "encoder_type": "Label"}}}}"#
        )
        .unwrap();
        match TrainingConfig::from_json_file(file.path()) {
            Err(ScoreError::ConfigError(msg)) => assert!(msg.contains("preprocessing"), "{msg}"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
