//! Student score CLI module
//!
//! Command-line interface for training and single-row prediction.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::error::ScoreError;
use crate::export::ArtifactPaths;
use crate::inference::{PredictionRequest, PredictionService};
use crate::training::{TrainingConfig, TrainingPipeline};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn bad(s: &str) -> ColoredString    { s.truecolor(235, 100, 100) }

fn step_run(msg: &str) {
    println!("  {} {}...", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("  {} {}", ok("✓"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "student-score")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train and serve a student math score regressor")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search every model family and persist the best one
    Train {
        /// Student performance CSV
        #[arg(short, long)]
        data: PathBuf,

        /// JSON training config; flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Cross-validation folds per candidate
        #[arg(long)]
        cv_folds: Option<usize>,

        /// Largest search space searched exhaustively
        #[arg(long)]
        grid_limit: Option<usize>,

        /// Lower bound on randomized search iterations
        #[arg(long)]
        min_iter: Option<usize>,

        /// Upper bound on randomized search iterations
        #[arg(long)]
        max_iter: Option<usize>,

        /// Seed for the split and randomized search
        #[arg(long)]
        seed: Option<u64>,

        /// Artifact directory
        #[arg(short, long)]
        artifacts: Option<PathBuf>,

        /// Also write raw/train/test CSV snapshots to the artifact directory
        #[arg(long)]
        snapshot: bool,

        /// Print the report as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Predict a math score from one student's fields
    Predict {
        #[arg(long)]
        gender: Option<String>,

        #[arg(long, alias = "race-ethnicity")]
        ethnicity: Option<String>,

        #[arg(long)]
        parental_level_of_education: Option<String>,

        #[arg(long)]
        lunch: Option<String>,

        #[arg(long)]
        test_preparation_course: Option<String>,

        #[arg(long)]
        reading_score: Option<String>,

        #[arg(long)]
        writing_score: Option<String>,

        /// Artifact directory
        #[arg(short, long, default_value = "artifacts")]
        artifacts: PathBuf,
    },
}

/// Search overrides given on the command line
#[derive(Debug, Clone, Default)]
pub struct TrainOverrides {
    pub cv_folds: Option<usize>,
    pub grid_limit: Option<usize>,
    pub min_iter: Option<usize>,
    pub max_iter: Option<usize>,
    pub seed: Option<u64>,
    pub artifacts: Option<PathBuf>,
    pub snapshot: bool,
}

impl TrainOverrides {
    /// Apply the overrides on top of `config`
    pub fn apply(&self, mut config: TrainingConfig) -> TrainingConfig {
        if let Some(v) = self.cv_folds {
            config.search.cv_folds = v;
        }
        if let Some(v) = self.grid_limit {
            config.search.grid_limit = v;
        }
        if let Some(v) = self.min_iter {
            config.search.min_iter = v;
        }
        if let Some(v) = self.max_iter {
            config.search.max_iter = v;
        }
        if let Some(seed) = self.seed {
            config.search.seed = seed;
            config.split.seed = seed;
        }
        if let Some(dir) = &self.artifacts {
            config.artifacts = ArtifactPaths::in_dir(dir);
        }
        if self.snapshot {
            let dir = config
                .artifacts
                .model
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            config.snapshot_dir = Some(dir);
        }
        config
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    data_path: &Path,
    config_path: Option<&Path>,
    overrides: &TrainOverrides,
    json: bool,
) -> anyhow::Result<()> {
    let config = match config_path {
        Some(path) => TrainingConfig::from_json_file(path)?,
        None => TrainingConfig::default(),
    };
    let config = overrides.apply(config);
    let pipeline = TrainingPipeline::new(config)?;

    if json {
        let report = pipeline.run_csv(data_path)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    section("Train");
    step_run(&format!("Searching models on {}", data_path.display()));
    let start = Instant::now();
    let report = pipeline.run_csv(data_path)?;
    step_done(&format!("{:.1?}", start.elapsed()));

    println!();
    for line in report.leaderboard.to_string().lines() {
        println!("  {}", line);
    }
    println!();
    println!("  {:<16} {}", muted("Best model"), report.best_family.cyan().bold());
    println!("  {:<16} {}", muted("Held-out R²"), format!("{:.4}", report.best_score).white().bold());
    println!("  {:<16} {}", muted("Preprocessor"), report.artifacts.preprocessor.display());
    println!("  {:<16} {}", muted("Model"), report.artifacts.model.display());
    println!();

    Ok(())
}

pub fn cmd_predict(request: &PredictionRequest, artifacts: &Path) -> anyhow::Result<()> {
    section("Predict");
    let service = PredictionService::new(ArtifactPaths::in_dir(artifacts));

    match service.predict_request(request) {
        Ok(score) => {
            println!("  {:<16} {}", muted("Math score"), format!("{:.1}", score).white().bold());
            println!();
            Ok(())
        }
        Err(ScoreError::Validation(errors)) => {
            for err in &errors.errors {
                println!("  {} {} {}", bad("✗"), err.field.white(), muted(&err.problem.to_string()));
            }
            println!();
            anyhow::bail!("{} invalid field(s)", errors.errors.len())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply() {
        let overrides = TrainOverrides {
            cv_folds: Some(5),
            seed: Some(7),
            artifacts: Some(PathBuf::from("out")),
            snapshot: true,
            ..Default::default()
        };
        let config = overrides.apply(TrainingConfig::default());
        assert_eq!(config.search.cv_folds, 5);
        assert_eq!(config.search.grid_limit, 60);
        assert_eq!(config.search.seed, 7);
        assert_eq!(config.split.seed, 7);
        assert_eq!(config.artifacts.model, PathBuf::from("out/model.bin"));
        assert_eq!(config.snapshot_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_parse_predict_alias() {
        let cli = Cli::try_parse_from([
            "student-score",
            "predict",
            "--gender",
            "female",
            "--race-ethnicity",
            "group B",
            "--reading-score",
            "72",
        ])
        .unwrap();
        match cli.command {
            Commands::Predict { gender, ethnicity, writing_score, .. } => {
                assert_eq!(gender.as_deref(), Some("female"));
                assert_eq!(ethnicity.as_deref(), Some("group B"));
                assert!(writing_score.is_none());
            }
            _ => panic!("expected predict"),
        }
    }
}
