//! Artifact persistence
//!
//! The fitted preprocessor and the winning estimator are stored as two
//! independently loadable binary files. Saves are atomic; loads distinguish a
//! missing artifact from a corrupt one.

mod store;

pub use store::{
    load_artifact, save_artifact, stage_artifact, Artifact, ArtifactKind, ArtifactPaths,
    ArtifactStore, StagedArtifact,
};
