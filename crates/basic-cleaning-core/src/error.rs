// crates/basic-cleaning-core/src/error.rs

use thiserror::Error;

use crate::artifact::ReferenceError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum CleaningError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Artifact store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid artifact reference: {0}")]
    Reference(#[from] ReferenceError),

    #[error("Dataset is missing required column `{0}`")]
    MissingColumn(&'static str),
}

pub type Result<T> = std::result::Result<T, CleaningError>;
