//! Integration test: preprocessing on the full student schema

mod common;

use common::{create_student_dataset, EDUCATION, RACES};
use polars::prelude::*;
use student_score::export::{load_artifact, save_artifact};
use student_score::preprocessing::{
    FeatureSpec, Preprocessor, PreprocessorBuilder, FEATURE_ORDER, TARGET_COLUMN,
};
use student_score::ScoreError;
use tempfile::TempDir;

fn fitted(train: &DataFrame) -> Preprocessor {
    let mut pre = PreprocessorBuilder::new()
        .build(FeatureSpec::student_performance())
        .unwrap();
    pre.fit(train).unwrap();
    pre
}

#[test]
fn test_output_width_matches_vocabularies() {
    let train = create_student_dataset(200, 1);
    let pre = fitted(&train);
    let x = pre.transform(&train).unwrap();

    // 2 numeric + 2 gender + 5 race + 6 education + 2 lunch + 2 prep
    let expected = 2 + 2 + RACES.len() + EDUCATION.len() + 2 + 2;
    assert_eq!(x.ncols(), expected);
    assert_eq!(pre.n_features(), expected);
    assert_eq!(&pre.feature_names()[..2], &["reading_score", "writing_score"]);
    assert_eq!(x.nrows(), 200);
}

#[test]
fn test_scaled_numeric_block_is_standardized() {
    let train = create_student_dataset(300, 2);
    let x = fitted(&train).transform(&train).unwrap();
    for j in 0..2 {
        let col = x.column(j);
        let mean = col.mean().unwrap();
        let var = col.mapv(|v| (v - mean).powi(2)).mean().unwrap();
        assert!(mean.abs() < 1e-9);
        assert!((var - 1.0).abs() < 1e-9);
    }
}

#[test]
fn test_unseen_category_yields_zero_block() {
    let train = create_student_dataset(100, 3);
    let pre = fitted(&train);
    let row = df!(
        "gender" => ["female"],
        "race_ethnicity" => ["group Z"],
        "parental_level_of_education" => ["doctorate"],
        "lunch" => ["standard"],
        "test_preparation_course" => ["none"],
        "reading_score" => [70.0],
        "writing_score" => [70.0],
    )
    .unwrap();

    let x = pre.transform(&row).unwrap();
    let names = pre.feature_names();
    for (j, name) in names.iter().enumerate() {
        if name.starts_with("race_ethnicity_") || name.starts_with("parental_level_of_education_") {
            assert_eq!(x[[0, j]], 0.0, "{name} should be zero");
        }
    }
    // the other blocks still have exactly one hot entry each
    let hot: f64 = x.row(0).iter().skip(2).sum();
    assert_eq!(hot, 3.0);
}

#[test]
fn test_input_column_order_is_irrelevant() {
    let train = create_student_dataset(80, 4);
    let pre = fitted(&train);
    let reversed: Vec<&str> = FEATURE_ORDER.iter().rev().copied().collect();
    let shuffled = train.select(reversed).unwrap();
    assert_eq!(pre.transform(&train).unwrap(), pre.transform(&shuffled).unwrap());
}

#[test]
fn test_round_trip_is_bit_identical() {
    let train = create_student_dataset(150, 5);
    let held_out = create_student_dataset(40, 6);
    let pre = fitted(&train);

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("preprocessor.bin");
    save_artifact(&path, &pre).unwrap();
    let loaded: Preprocessor = load_artifact(&path).unwrap();

    let before = pre.transform(&held_out).unwrap();
    let after = loaded.transform(&held_out).unwrap();
    assert!(before
        .iter()
        .zip(after.iter())
        .all(|(a, b)| a.to_bits() == b.to_bits()));
    assert_eq!(loaded.feature_names(), pre.feature_names());
}

#[test]
fn test_held_out_does_not_change_fitted_state() {
    let train = create_student_dataset(120, 7);
    let held_out = create_student_dataset(30, 8);
    let pre = fitted(&train);
    let first = pre.transform(&train).unwrap();
    let _ = pre.transform(&held_out).unwrap();
    assert_eq!(pre.transform(&train).unwrap(), first);
}

#[test]
fn test_missing_target_value_rejected() {
    let mut train = create_student_dataset(10, 9);
    let target: Vec<Option<f64>> = (0..10).map(|i| if i == 3 { None } else { Some(50.0) }).collect();
    train
        .with_column(Column::new(TARGET_COLUMN.into(), target))
        .unwrap();
    let pre = fitted(&train);
    assert!(matches!(pre.target(&train), Err(ScoreError::DataShapeError(_))));
}
