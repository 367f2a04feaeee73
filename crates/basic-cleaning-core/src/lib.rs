//! Basic cleaning step: fetch a raw listings artifact, drop price outliers,
//! normalize `last_review` to a date, and publish the cleaned artifact.

pub mod artifact;
pub mod cleaning;
pub mod error;
pub mod pipeline;
pub mod run;
pub mod store;
pub mod table;

pub use artifact::{ArtifactRef, ArtifactVersion, ReferenceError, VersionSelector};
pub use cleaning::{clean_listings, PriceRange};
pub use error::{CleaningError, Result};
pub use pipeline::{run_basic_cleaning, CleaningConfig, CleaningReport};
pub use run::RunContext;
pub use store::{ArtifactStore, FetchedArtifact, PublishRequest, StoreError};
