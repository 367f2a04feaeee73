use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::local::validate_alias;
use super::{ArtifactManifest, ArtifactStore, FetchedArtifact, PublishRequest, StoreError};
use crate::artifact::{
    content_digest, validate_name, ArtifactRef, ArtifactVersion, VersionSelector, LATEST_ALIAS,
};
use crate::run::RunContext;

/// Keeps every artifact in memory. Fetched payloads are written under
/// `staging_dir` because callers expect a readable local file.
#[derive(Debug)]
pub struct MemoryArtifactStore {
    staging_dir: PathBuf,
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    artifacts: HashMap<String, StoredArtifact>,
    runs: Vec<RunContext>,
}

#[derive(Debug, Default)]
struct StoredArtifact {
    versions: Vec<(ArtifactManifest, Vec<u8>)>,
    aliases: HashMap<String, u32>,
}

impl StoredArtifact {
    fn resolve(&self, selector: &VersionSelector) -> Option<&(ArtifactManifest, Vec<u8>)> {
        let version = match selector {
            VersionSelector::Version(version) => *version,
            VersionSelector::Alias(alias) => *self.aliases.get(alias)?,
        };
        self.versions.get(version as usize)
    }
}

impl MemoryArtifactStore {
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Publish raw bytes directly, as an upstream step would have.
    pub async fn seed(
        &self,
        name: &str,
        artifact_type: &str,
        file_name: &str,
        contents: impl Into<Vec<u8>>,
    ) -> Result<ArtifactVersion, StoreError> {
        validate_name(name)?;
        let mut state = self.state.lock().await;
        Ok(insert_version(
            &mut state,
            name,
            artifact_type,
            "",
            file_name,
            contents.into(),
            None,
            &[],
        ))
    }

    pub async fn contents(&self, name: &str, version: u32) -> Option<Vec<u8>> {
        let state = self.state.lock().await;
        state
            .artifacts
            .get(name)?
            .versions
            .get(version as usize)
            .map(|(_, contents)| contents.clone())
    }

    pub async fn manifests(&self, name: &str) -> Vec<ArtifactManifest> {
        let state = self.state.lock().await;
        state
            .artifacts
            .get(name)
            .map(|stored| {
                stored
                    .versions
                    .iter()
                    .map(|(manifest, _)| manifest.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn runs(&self) -> Vec<RunContext> {
        self.state.lock().await.runs.clone()
    }
}

#[allow(clippy::too_many_arguments)]
fn insert_version(
    state: &mut MemoryState,
    name: &str,
    artifact_type: &str,
    description: &str,
    file_name: &str,
    contents: Vec<u8>,
    producer: Option<Uuid>,
    aliases: &[String],
) -> ArtifactVersion {
    let stored = state.artifacts.entry(name.to_string()).or_default();
    let version = stored.versions.len() as u32;
    let manifest = ArtifactManifest {
        name: name.to_string(),
        version,
        artifact_type: artifact_type.to_string(),
        description: description.to_string(),
        file_name: file_name.to_string(),
        size_bytes: contents.len() as u64,
        digest: content_digest(&contents),
        created_at: Utc::now(),
        produced_by_run: producer,
    };
    let published = manifest.artifact_version();

    stored.versions.push((manifest, contents));
    stored.aliases.insert(LATEST_ALIAS.to_string(), version);
    for alias in aliases {
        stored.aliases.insert(alias.clone(), version);
    }
    published
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn fetch(&self, reference: &ArtifactRef) -> Result<FetchedArtifact, StoreError> {
        let (manifest, contents) = {
            let state = self.state.lock().await;
            state
                .artifacts
                .get(&reference.name)
                .and_then(|stored| stored.resolve(&reference.selector))
                .cloned()
                .ok_or_else(|| StoreError::not_found(reference))?
        };

        let dir = self
            .staging_dir
            .join(&manifest.name)
            .join(format!("v{}", manifest.version));
        fs::create_dir_all(&dir).await?;
        let path = dir.join(&manifest.file_name);
        fs::write(&path, &contents).await?;

        Ok(FetchedArtifact {
            version: manifest.artifact_version(),
            artifact_type: manifest.artifact_type,
            path,
        })
    }

    async fn publish(&self, request: &PublishRequest) -> Result<ArtifactVersion, StoreError> {
        validate_name(&request.name)?;
        for alias in &request.aliases {
            validate_alias(alias)?;
        }
        let file_name = request.file_name()?;
        let contents = fs::read(&request.file).await?;

        let mut state = self.state.lock().await;
        Ok(insert_version(
            &mut state,
            &request.name,
            &request.artifact_type,
            &request.description,
            &file_name,
            contents,
            request.producer,
            &request.aliases,
        ))
    }

    async fn record_run(&self, run: &RunContext) -> Result<(), StoreError> {
        self.state.lock().await.runs.push(run.clone());
        Ok(())
    }
}
