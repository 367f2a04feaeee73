//! Versioned artifact storage. The pipeline only needs to fetch one artifact
//! and publish another, so the seam is deliberately narrow.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::artifact::{ArtifactRef, ArtifactVersion, ReferenceError};
use crate::run::RunContext;

pub mod local;
pub mod memory;

pub use local::LocalArtifactStore;
pub use memory::MemoryArtifactStore;

pub(crate) const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("artifact not found: {0}")]
    NotFound(String),
    #[error("artifact version already exists: {0}")]
    AlreadyExists(String),
    #[error("invalid artifact name: {0}")]
    InvalidName(#[from] ReferenceError),
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("artifact manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub(crate) fn not_found(what: impl fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }
}

/// Everything needed to create one new artifact version from a local file.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub name: String,
    pub artifact_type: String,
    pub description: String,
    pub file: PathBuf,
    /// Extra aliases to point at the new version; `latest` always moves.
    pub aliases: Vec<String>,
    pub producer: Option<Uuid>,
}

impl PublishRequest {
    pub fn new(
        name: impl Into<String>,
        artifact_type: impl Into<String>,
        description: impl Into<String>,
        file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            artifact_type: artifact_type.into(),
            description: description.into(),
            file: file.into(),
            aliases: Vec::new(),
            producer: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub(crate) fn file_name(&self) -> Result<String, StoreError> {
        self.file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                StoreError::Backend(format!("{} does not name a file", self.file.display()))
            })
    }
}

/// Stored next to every artifact version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub name: String,
    pub version: u32,
    pub artifact_type: String,
    pub description: String,
    pub file_name: String,
    pub size_bytes: u64,
    pub digest: String,
    pub created_at: DateTime<Utc>,
    pub produced_by_run: Option<Uuid>,
}

impl ArtifactManifest {
    pub fn artifact_version(&self) -> ArtifactVersion {
        ArtifactVersion {
            name: self.name.clone(),
            version: self.version,
            digest: self.digest.clone(),
        }
    }
}

/// A resolved artifact whose payload is readable at `path`.
#[derive(Debug, Clone)]
pub struct FetchedArtifact {
    pub version: ArtifactVersion,
    pub artifact_type: String,
    pub path: PathBuf,
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn fetch(&self, reference: &ArtifactRef) -> Result<FetchedArtifact, StoreError>;

    async fn publish(&self, request: &PublishRequest) -> Result<ArtifactVersion, StoreError>;

    async fn record_run(&self, run: &RunContext) -> Result<(), StoreError> {
        let _ = run;
        Ok(())
    }
}
