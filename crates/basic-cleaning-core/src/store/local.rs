use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    ArtifactManifest, ArtifactStore, FetchedArtifact, PublishRequest, StoreError, MANIFEST_FILE,
};
use crate::artifact::{
    content_digest, validate_name, ArtifactRef, ArtifactVersion, VersionSelector, LATEST_ALIAS,
};
use crate::run::RunContext;

const ARTIFACTS_DIR: &str = "artifacts";
const RUNS_DIR: &str = "runs";
const ALIASES_FILE: &str = "aliases.json";

/// Artifact store rooted at a local directory.
///
/// ```text
/// <root>/artifacts/<name>/v<N>/<file>
/// <root>/artifacts/<name>/v<N>/manifest.json
/// <root>/artifacts/<name>/aliases.json
/// <root>/runs/<run_id>.json
/// ```
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(root.join(ARTIFACTS_DIR)).await?;
        fs::create_dir_all(root.join(RUNS_DIR)).await?;
        Ok(Self { root })
    }

    pub fn run_path(&self, run_id: Uuid) -> PathBuf {
        self.root.join(RUNS_DIR).join(format!("{run_id}.json"))
    }

    fn artifact_dir(&self, name: &str) -> PathBuf {
        self.root.join(ARTIFACTS_DIR).join(name)
    }

    fn version_dir(&self, name: &str, version: u32) -> PathBuf {
        self.artifact_dir(name).join(format!("v{version}"))
    }

    /// Manifests of every completed version of `name`, oldest first.
    ///
    /// A version directory without a manifest is an interrupted publish and
    /// is skipped.
    pub async fn list_versions(&self, name: &str) -> Result<Vec<ArtifactManifest>, StoreError> {
        validate_name(name)?;
        let mut manifests = Vec::new();
        for version in self.existing_versions(name).await? {
            match self.read_manifest(name, version).await {
                Ok(manifest) => manifests.push(manifest),
                Err(StoreError::NotFound(_)) => {
                    warn!(artifact = name, version, "skipping version without manifest");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(manifests)
    }

    async fn existing_versions(&self, name: &str) -> Result<Vec<u32>, StoreError> {
        let mut entries = match fs::read_dir(self.artifact_dir(name)).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut versions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let file_name = entry.file_name();
            let parsed = file_name
                .to_str()
                .and_then(|label| label.strip_prefix('v'))
                .and_then(|digits| digits.parse::<u32>().ok());
            if let Some(version) = parsed {
                versions.push(version);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    async fn read_aliases(&self, name: &str) -> Result<BTreeMap<String, u32>, StoreError> {
        match fs::read(self.artifact_dir(name).join(ALIASES_FILE)).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_aliases(
        &self,
        name: &str,
        aliases: &BTreeMap<String, u32>,
    ) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(aliases)?;
        fs::write(self.artifact_dir(name).join(ALIASES_FILE), bytes).await?;
        Ok(())
    }

    async fn read_manifest(&self, name: &str, version: u32) -> Result<ArtifactManifest, StoreError> {
        let path = self.version_dir(name, version).join(MANIFEST_FILE);
        match fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StoreError::not_found(format!("{name}:v{version}")))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn resolve(&self, reference: &ArtifactRef) -> Result<u32, StoreError> {
        match &reference.selector {
            VersionSelector::Version(version) => Ok(*version),
            VersionSelector::Alias(alias) => self
                .read_aliases(&reference.name)
                .await?
                .get(alias)
                .copied()
                .ok_or_else(|| StoreError::not_found(reference)),
        }
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn fetch(&self, reference: &ArtifactRef) -> Result<FetchedArtifact, StoreError> {
        validate_name(&reference.name)?;
        let version = self.resolve(reference).await?;
        let manifest = self.read_manifest(&reference.name, version).await?;
        let path = self
            .version_dir(&reference.name, version)
            .join(&manifest.file_name);

        let contents = match fs::read(&path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::not_found(path.display()))
            }
            Err(err) => return Err(err.into()),
        };
        if content_digest(&contents) != manifest.digest {
            return Err(StoreError::Backend(format!(
                "payload of {} does not match its recorded digest",
                manifest.artifact_version()
            )));
        }

        debug!(artifact = %reference, path = %path.display(), "resolved artifact");
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
        if file_name == MANIFEST_FILE {
            return Err(StoreError::Backend(format!(
                "payload file name `{MANIFEST_FILE}` is reserved"
            )));
        }

        let contents = fs::read(&request.file).await?;
        fs::create_dir_all(self.artifact_dir(&request.name)).await?;

        let version = self
            .existing_versions(&request.name)
            .await?
            .last()
            .map_or(0, |latest| latest + 1);
        let version_dir = self.version_dir(&request.name, version);
        // Non-recursive so an existing version directory is never reused.
        fs::create_dir(&version_dir).await.map_err(|err| {
            if err.kind() == ErrorKind::AlreadyExists {
                StoreError::AlreadyExists(format!("{}:v{version}", request.name))
            } else {
                err.into()
            }
        })?;

        fs::write(version_dir.join(&file_name), &contents).await?;

        let manifest = ArtifactManifest {
            name: request.name.clone(),
            version,
            artifact_type: request.artifact_type.clone(),
            description: request.description.clone(),
            file_name,
            size_bytes: contents.len() as u64,
            digest: content_digest(&contents),
            created_at: Utc::now(),
            produced_by_run: request.producer,
        };
        // The manifest marks the version complete, so it only appears whole.
        let staged_manifest = version_dir.join(format!("{MANIFEST_FILE}.tmp"));
        fs::write(&staged_manifest, serde_json::to_vec_pretty(&manifest)?).await?;
        fs::rename(&staged_manifest, version_dir.join(MANIFEST_FILE)).await?;

        let mut aliases = self.read_aliases(&request.name).await?;
        aliases.insert(LATEST_ALIAS.to_string(), version);
        for alias in &request.aliases {
            aliases.insert(alias.clone(), version);
        }
        self.write_aliases(&request.name, &aliases).await?;

        let published = manifest.artifact_version();
        info!(
            artifact = %published,
            artifact_type = %manifest.artifact_type,
            size_bytes = manifest.size_bytes,
            "stored artifact version"
        );
        Ok(published)
    }

    async fn record_run(&self, run: &RunContext) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(run)?;
        fs::write(self.run_path(run.id()), bytes).await?;
        Ok(())
    }
}

/// Aliases share the selector namespace with `vN` labels.
pub(crate) fn validate_alias(alias: &str) -> Result<(), StoreError> {
    validate_name(alias)?;
    let looks_like_version = alias
        .strip_prefix('v')
        .is_some_and(|digits| digits.parse::<u32>().is_ok());
    if looks_like_version {
        return Err(StoreError::Backend(format!(
            "alias `{alias}` collides with a version label"
        )));
    }
    Ok(())
}
