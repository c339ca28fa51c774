//! Data ingestion utilities

pub mod data_loader;

pub use data_loader::{load_csv, save_csv, snapshot_splits, train_test_split, SplitConfig};
