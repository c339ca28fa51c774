//! Atomic artifact persistence
//!
//! An artifact file is a 4-byte magic followed by a bincode-encoded
//! `(ArtifactKind, payload)` pair. Writes go to a temporary file in the
//! target's directory which is then renamed over the target, so a reader
//! sees either the previous file, the new file, or nothing.

use crate::error::{Result, ScoreError};
use crate::preprocessing::Preprocessor;
use crate::training::Regressor;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

const MAGIC: &[u8; 4] = b"SSAF";

/// What an artifact file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    Preprocessor,
    Estimator,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Preprocessor => write!(f, "preprocessor"),
            ArtifactKind::Estimator => write!(f, "estimator"),
        }
    }
}

/// An object the store knows how to persist
pub trait Artifact: Serialize + DeserializeOwned {
    const KIND: ArtifactKind;
}

impl Artifact for Preprocessor {
    const KIND: ArtifactKind = ArtifactKind::Preprocessor;
}

impl Artifact for Regressor {
    const KIND: ArtifactKind = ArtifactKind::Estimator;
}

/// An artifact fully written to a temporary file but not yet visible at its
/// final path. Dropping it without [`commit`](Self::commit) discards the
/// temporary file and leaves the target untouched.
#[derive(Debug)]
pub struct StagedArtifact {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedArtifact {
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Path of the temporary file
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Atomically rename the temporary file onto the target
    pub fn commit(self) -> Result<()> {
        let target = self.target;
        self.temp
            .persist(&target)
            .map_err(|e| ScoreError::IoError(e.error))?;
        info!(path = %target.display(), "Artifact saved");
        Ok(())
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Serialize `object` into a temporary file next to `path`
pub fn stage_artifact<T: Artifact>(path: &Path, object: &T) -> Result<StagedArtifact> {
    let dir = parent_dir(path);
    fs::create_dir_all(&dir)?;

    let mut temp = NamedTempFile::new_in(&dir)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        writer.write_all(MAGIC)?;
        bincode::serialize_into(&mut writer, &(T::KIND, object))
            .map_err(|e| ScoreError::SerializationError(format!("failed to encode {}: {}", T::KIND, e)))?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    debug!(path = %path.display(), kind = %T::KIND, "Artifact staged");

    Ok(StagedArtifact {
        temp,
        target: path.to_path_buf(),
    })
}

/// Write `object` to `path`, replacing any previous artifact atomically
pub fn save_artifact<T: Artifact>(path: &Path, object: &T) -> Result<()> {
    stage_artifact(path, object)?.commit()
}

/// Current contents of `path`, or `None` when nothing is there yet
fn read_existing(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Put `previous` back at `path`, or remove `path` if there was nothing
fn restore_existing(path: &Path, previous: Option<Vec<u8>>) -> Result<()> {
    match previous {
        Some(bytes) => {
            let mut temp = NamedTempFile::new_in(parent_dir(path))?;
            temp.write_all(&bytes)?;
            temp.as_file().sync_all()?;
            temp.persist(path).map_err(|e| ScoreError::IoError(e.error))?;
        }
        None => match fs::remove_file(path) {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        },
    }
    Ok(())
}

/// Read an artifact of kind `T` from `path`
pub fn load_artifact<T: Artifact>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ScoreError::ArtifactNotFound(path.to_path_buf()),
        _ => ScoreError::IoError(e),
    })?;
    let corrupt = |reason: String| ScoreError::CorruptArtifact {
        path: path.to_path_buf(),
        reason,
    };

    let body = bytes
        .strip_prefix(MAGIC.as_slice())
        .ok_or_else(|| corrupt("not an artifact file".to_string()))?;
    let kind: ArtifactKind =
        bincode::deserialize(body).map_err(|e| corrupt(format!("unreadable header: {}", e)))?;
    if kind != T::KIND {
        return Err(corrupt(format!("expected {} artifact, found {}", T::KIND, kind)));
    }
    let (_, object): (ArtifactKind, T) =
        bincode::deserialize(body).map_err(|e| corrupt(format!("unreadable {}: {}", kind, e)))?;

    debug!(path = %path.display(), kind = %kind, bytes = bytes.len(), "Artifact loaded");
    Ok(object)
}

/// Where the two artifacts of a training run live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactPaths {
    pub preprocessor: PathBuf,
    pub model: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::in_dir("artifacts")
    }
}

impl ArtifactPaths {
    /// `preprocessor.bin` and `model.bin` inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            preprocessor: dir.join("preprocessor.bin"),
            model: dir.join("model.bin"),
        }
    }
}

/// Saves and loads the preprocessor/estimator pair
#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    paths: ArtifactPaths,
}

impl ArtifactStore {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// Persist both artifacts. Both are fully written before either is
    /// renamed into place, so an encoding failure replaces nothing. If the
    /// model cannot be renamed into place, the previous preprocessor file
    /// (or its absence) is restored before the error is returned.
    pub fn save(&self, preprocessor: &Preprocessor, model: &Regressor) -> Result<()> {
        let staged_preprocessor = stage_artifact(&self.paths.preprocessor, preprocessor)?;
        let staged_model = stage_artifact(&self.paths.model, model)?;
        let previous = read_existing(&self.paths.preprocessor)?;

        staged_preprocessor.commit()?;
        if let Err(err) = staged_model.commit() {
            warn!(
                path = %self.paths.model.display(),
                error = %err,
                "Model commit failed, restoring previous preprocessor"
            );
            if let Err(restore_err) = restore_existing(&self.paths.preprocessor, previous) {
                error!(
                    path = %self.paths.preprocessor.display(),
                    error = %restore_err,
                    "Could not restore previous preprocessor"
                );
            }
            return Err(err);
        }
        Ok(())
    }

    pub fn load_preprocessor(&self) -> Result<Preprocessor> {
        load_artifact(&self.paths.preprocessor)
    }

    pub fn load_model(&self) -> Result<Regressor> {
        load_artifact(&self.paths.model)
    }

    /// Load both artifacts, preprocessor first
    pub fn load(&self) -> Result<(Preprocessor, Regressor)> {
        Ok((self.load_preprocessor()?, self.load_model()?))
    }
}
