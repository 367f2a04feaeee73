//! Artifact naming: references used to fetch, versions handed back by publish.

use std::fmt;
use std::str::FromStr;

use blake3::Hasher;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LATEST_ALIAS: &str = "latest";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("artifact name cannot be empty")]
    EmptyName,

    #[error("artifact name `{0}` may only contain ASCII letters, digits, '-', '_' and '.'")]
    InvalidName(String),

    #[error("reference `{0}` has an empty version or alias after ':'")]
    EmptySelector(String),
}

/// Which version of a named artifact a reference points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionSelector {
    Version(u32),
    Alias(String),
}

impl VersionSelector {
    pub fn latest() -> Self {
        VersionSelector::Alias(LATEST_ALIAS.to_string())
    }

    fn parse(raw: &str) -> Self {
        raw.strip_prefix('v')
            .and_then(|digits| digits.parse::<u32>().ok())
            .map(VersionSelector::Version)
            .unwrap_or_else(|| VersionSelector::Alias(raw.to_string()))
    }
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSelector::Version(version) => write!(f, "v{version}"),
            VersionSelector::Alias(alias) => f.write_str(alias),
        }
    }
}

/// `name`, `name:v3` or `name:alias`. A bare name resolves through `latest`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactRef {
    pub name: String,
    pub selector: VersionSelector,
}

impl ArtifactRef {
    pub fn new(name: impl Into<String>, selector: VersionSelector) -> Result<Self, ReferenceError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self { name, selector })
    }
}

impl FromStr for ArtifactRef {
    type Err = ReferenceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        match raw.rsplit_once(':') {
            Some((_, "")) => Err(ReferenceError::EmptySelector(raw.to_string())),
            Some((name, selector)) => ArtifactRef::new(name, VersionSelector::parse(selector)),
            None => ArtifactRef::new(raw, VersionSelector::latest()),
        }
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.selector)
    }
}

/// A concrete, immutable artifact version as assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactVersion {
    pub name: String,
    pub version: u32,
    pub digest: String,
}

impl ArtifactVersion {
    pub fn version_label(&self) -> String {
        format!("v{}", self.version)
    }
}

impl fmt::Display for ArtifactVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version_label())
    }
}

/// Artifact names double as directory names in the local store.
pub fn validate_name(name: &str) -> Result<(), ReferenceError> {
    if name.is_empty() {
        return Err(ReferenceError::EmptyName);
    }
    let allowed = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !allowed || name == "." || name == ".." {
        return Err(ReferenceError::InvalidName(name.to_string()));
    }
    Ok(())
}

pub fn content_digest(contents: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(contents);
    hasher.finalize().to_hex().to_string()
}
