//! Student score - Main Entry Point

use clap::Parser;
use student_score::cli::{cmd_predict, cmd_train, Cli, Commands, TrainOverrides};
use student_score::inference::{PredictionRequest, RawScore};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "student_score=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            data,
            config,
            cv_folds,
            grid_limit,
            min_iter,
            max_iter,
            seed,
            artifacts,
            snapshot,
            json,
        } => {
            let overrides = TrainOverrides {
                cv_folds,
                grid_limit,
                min_iter,
                max_iter,
                seed,
                artifacts,
                snapshot,
            };
            cmd_train(&data, config.as_deref(), &overrides, json)?;
        }
        Commands::Predict {
            gender,
            ethnicity,
            parental_level_of_education,
            lunch,
            test_preparation_course,
            reading_score,
            writing_score,
            artifacts,
        } => {
            let request = PredictionRequest {
                gender,
                race_ethnicity: ethnicity,
                parental_level_of_education,
                lunch,
                test_preparation_course,
                reading_score: reading_score.map(RawScore::Text),
                writing_score: writing_score.map(RawScore::Text),
            };
            cmd_predict(&request, &artifacts)?;
        }
    }

    Ok(())
}
