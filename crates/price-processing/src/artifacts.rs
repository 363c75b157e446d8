//! Versioned artifact persistence.
//!
//! Every fitted object (encoder, imputer, retained columns, manifest, trained
//! model) is an explicit serde struct carrying a `schema_version`. Artifacts
//! are stored as JSON documents keyed by name; loading checks the version
//! before deserializing the body, so a layout change surfaces as
//! [`PreprocessingError::IncompatibleArtifactVersion`] instead of a shape
//! mismatch further down the pipeline.

use crate::error::{PreprocessingError, Result};
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Schema version written into every artifact produced by this crate.
pub const ARTIFACT_SCHEMA_VERSION: u32 = 1;

/// A persisted, versioned pipeline object.
pub trait Artifact: Serialize + DeserializeOwned {
    /// Stable artifact name, also used as the default store key.
    const KIND: &'static str;

    /// Schema version the value was created with.
    fn schema_version(&self) -> u32;

    /// Training run that produced the value.
    ///
    /// Artifacts from one run share an id; loading a set with mixed ids is
    /// an [`ArtifactMismatch`](PreprocessingError::ArtifactMismatch).
    fn run_id(&self) -> &str;
}

/// Fresh identifier for a training run.
pub fn new_run_id() -> String {
    format!(
        "{}-{:08x}",
        Utc::now().format("%Y%m%dT%H%M%S%.6fZ"),
        rand::random::<u32>()
    )
}

/// Key-value storage for artifacts.
pub trait ArtifactStore {
    /// Persist an artifact under `key`, replacing any previous value.
    fn save<A: Artifact>(&self, key: &str, artifact: &A) -> Result<()>;

    /// Load the artifact stored under `key`.
    fn load<A: Artifact>(&self, key: &str) -> Result<A>;

    /// Whether something is stored under `key`.
    fn contains(&self, key: &str) -> bool;
}

/// Artifact store backed by one JSON file per key in a directory.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path an artifact key maps to.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn save<A: Artifact>(&self, key: &str, artifact: &A) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(key);
        let json = serde_json::to_vec_pretty(artifact)?;
        write_atomically(&path, &json)?;
        info!("Saved {} to {}", A::KIND, path.display());
        Ok(())
    }

    fn load<A: Artifact>(&self, key: &str) -> Result<A> {
        let path = self.path_for(key);
        if !path.exists() {
            return Err(PreprocessingError::ArtifactNotFound {
                path: path.display().to_string(),
            });
        }

        let bytes = fs::read(&path)?;
        let value: serde_json::Value = serde_json::from_slice(&bytes)?;
        let found = value
            .get("schema_version")
            .and_then(|v| v.as_u64())
            .map(|v| v as u32)
            .unwrap_or(0);

        if found != ARTIFACT_SCHEMA_VERSION {
            return Err(PreprocessingError::IncompatibleArtifactVersion {
                artifact: key.to_string(),
                found,
                expected: ARTIFACT_SCHEMA_VERSION,
            });
        }

        let artifact: A = serde_json::from_value(value)?;
        debug!("Loaded {} from {}", A::KIND, path.display());
        Ok(artifact)
    }

    fn contains(&self, key: &str) -> bool {
        self.path_for(key).exists()
    }
}

/// Write a file through a sibling temp file and a rename, so readers never
/// observe a partially written file.
pub fn write_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}
