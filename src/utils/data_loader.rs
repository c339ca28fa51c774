//! CSV ingestion and the seeded train/held-out split

use crate::error::{Result, ScoreError};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Load a CSV file with a header row
pub fn load_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let start = Instant::now();
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => {
            ScoreError::DataShapeError(format!("data file not found: {}", path.display()))
        }
        _ => ScoreError::IoError(e),
    })?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .into_reader_with_file_handle(file)
        .finish()?;

    info!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Loaded CSV"
    );
    Ok(df)
}

/// Write `df` as CSV, creating parent directories
pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

/// How the raw table is divided into training and held-out rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of rows held out, rounded up
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

impl SplitConfig {
    pub fn with_test_fraction(mut self, test_fraction: f64) -> Self {
        self.test_fraction = test_fraction;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ScoreError::ConfigError(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }
}

/// Shuffle rows with a seeded RNG and split off the held-out rows.
///
/// Returns `(train, held_out)`; both keep the input's columns.
pub fn train_test_split(df: &DataFrame, config: &SplitConfig) -> Result<(DataFrame, DataFrame)> {
    config.validate()?;
    let n = df.height();
    let n_test = (n as f64 * config.test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(ScoreError::DataShapeError(format!(
            "cannot split {} rows with test_fraction {}",
            n, config.test_fraction
        )));
    }

    let mut indices: Vec<IdxSize> = (0..n as IdxSize).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);
    let train = df.take(&IdxCa::from_vec("idx".into(), train_idx.to_vec()))?;
    let held_out = df.take(&IdxCa::from_vec("idx".into(), test_idx.to_vec()))?;

    info!(train = train.height(), held_out = held_out.height(), seed = config.seed, "Split data");
    Ok((train, held_out))
}

/// Write `raw.csv`, `train.csv` and `test.csv` into `dir`
pub fn snapshot_splits(
    dir: impl AsRef<Path>,
    raw: &DataFrame,
    train: &DataFrame,
    held_out: &DataFrame,
) -> Result<()> {
    let dir = dir.as_ref();
    save_csv(&mut raw.clone(), dir.join("raw.csv"))?;
    save_csv(&mut train.clone(), dir.join("train.csv"))?;
    save_csv(&mut held_out.clone(), dir.join("test.csv"))?;
    info!(dir = %dir.display(), "Saved data snapshots");
    Ok(())
}
