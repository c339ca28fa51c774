//! Integration test: persisting and reloading the trained pair

mod common;

use common::create_student_dataset;
use ndarray::Array2;
use std::fs;
use student_score::export::{
    load_artifact, save_artifact, stage_artifact, ArtifactPaths, ArtifactStore,
};
use student_score::preprocessing::{FeatureSpec, Preprocessor, PreprocessorBuilder};
use student_score::training::{
    Estimator, GradientBoostingRegressor, RandomForestRegressor, Regressor, RidgeRegression,
};
use student_score::ScoreError;
use tempfile::TempDir;

fn trained_pair(model: Regressor) -> (Preprocessor, Regressor, Array2<f64>) {
    let train = create_student_dataset(120, 21);
    let held_out = create_student_dataset(20, 22);
    let mut pre = PreprocessorBuilder::new()
        .build(FeatureSpec::student_performance())
        .unwrap();
    let x = pre.fit_transform(&train).unwrap();
    let y = pre.target(&train).unwrap();
    let mut model = model;
    model.fit(&x, &y).unwrap();
    let x_held = pre.transform(&held_out).unwrap();
    (pre, model, x_held)
}

#[test]
fn test_store_round_trip_keeps_predictions() {
    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::new(ArtifactPaths::in_dir(dir.path().join("run")));

    for model in [
        Regressor::from(RidgeRegression::new(1.0)),
        Regressor::from(RandomForestRegressor::new(10)),
        Regressor::from(GradientBoostingRegressor::default()),
    ] {
        let (pre, model, x_held) = trained_pair(model);
        store.save(&pre, &model).unwrap();

        let (loaded_pre, loaded_model) = store.load().unwrap();
        assert_eq!(loaded_model.kind(), model.kind());
        assert_eq!(loaded_pre.feature_names(), pre.feature_names());
        assert_eq!(
            loaded_model.predict(&x_held).unwrap(),
            model.predict(&x_held).unwrap()
        );
    }
}

#[test]
fn test_artifacts_load_independently() {
    let dir = TempDir::new().unwrap();
    let paths = ArtifactPaths::in_dir(dir.path());
    let (pre, model, _) = trained_pair(RidgeRegression::new(1.0).into());
    ArtifactStore::new(paths.clone()).save(&pre, &model).unwrap();

    let loaded: Regressor = load_artifact(&paths.model).unwrap();
    assert_eq!(loaded.kind(), "ridge");
    let loaded: Preprocessor = load_artifact(&paths.preprocessor).unwrap();
    assert!(loaded.is_fitted());
}

#[test]
fn test_staged_artifact_is_invisible_until_commit() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("model.bin");
    let (_, first, _) = trained_pair(RidgeRegression::new(1.0).into());
    let (_, second, _) = trained_pair(RidgeRegression::new(50.0).into());
    save_artifact(&path, &first).unwrap();
    let before = fs::read(&path).unwrap();

    // a crash after staging leaves the previous artifact in place
    let staged = stage_artifact(&path, &second).unwrap();
    let temp = staged.temp_path().to_path_buf();
    assert!(temp.exists());
    drop(staged);
    assert!(!temp.exists());
    assert_eq!(fs::read(&path).unwrap(), before);

    let staged = stage_artifact(&path, &second).unwrap();
    staged.commit().unwrap();
    assert_ne!(fs::read(&path).unwrap(), before);

    // no temporary files left behind
    let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_missing_and_corrupt_artifacts_are_distinguished() {
    let dir = TempDir::new().unwrap();
    let paths = ArtifactPaths::in_dir(dir.path());
    let store = ArtifactStore::new(paths.clone());

    assert!(matches!(store.load(), Err(ScoreError::ArtifactNotFound(_))));

    let (pre, model, _) = trained_pair(RidgeRegression::new(1.0).into());
    store.save(&pre, &model).unwrap();

    // truncated model file
    let bytes = fs::read(&paths.model).unwrap();
    fs::write(&paths.model, &bytes[..bytes.len() / 2]).unwrap();
    assert!(matches!(store.load_model(), Err(ScoreError::CorruptArtifact { .. })));
    assert!(store.load_preprocessor().is_ok());

    // arbitrary bytes
    fs::write(&paths.model, b"definitely not a model").unwrap();
    assert!(matches!(store.load_model(), Err(ScoreError::CorruptArtifact { .. })));

    // a preprocessor where the estimator should be
    fs::copy(&paths.preprocessor, &paths.model).unwrap();
    match store.load_model() {
        Err(ScoreError::CorruptArtifact { reason, .. }) => assert!(reason.contains("estimator")),
        other => panic!("unexpected result: {:?}", other.map(|m| m.kind())),
    }
}
