//! The basic cleaning step: fetch raw artifact -> clean -> publish clean artifact.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::artifact::{ArtifactRef, ArtifactVersion};
use crate::cleaning::{clean_listings, PriceRange};
use crate::error::Result;
use crate::run::RunContext;
use crate::store::{ArtifactStore, PublishRequest};
use crate::table::{read_table, write_table};

pub const JOB_TYPE: &str = "basic_cleaning";

/// Intermediate payload, written to the working directory and left there.
pub const CLEAN_SAMPLE_FILE: &str = "clean_sample.csv";

/// Parameters of one cleaning run, recorded verbatim on the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningConfig {
    pub input_artifact: String,
    pub output_artifact: String,
    pub output_type: String,
    pub output_description: String,
    pub min_price: f64,
    pub max_price: f64,
}

impl CleaningConfig {
    pub fn price_range(&self) -> PriceRange {
        PriceRange::new(self.min_price, self.max_price)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningReport {
    pub run_id: Uuid,
    pub input: ArtifactVersion,
    pub output: ArtifactVersion,
    pub rows_in: usize,
    pub rows_out: usize,
    pub local_file: PathBuf,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    rows_in: usize,
    rows_out: usize,
    rows_dropped: usize,
}

/// Run the step end to end. Any store or I/O failure aborts the run; the
/// intermediate file is not removed either way.
pub async fn run_basic_cleaning(
    store: &dyn ArtifactStore,
    config: CleaningConfig,
    work_dir: &Path,
) -> Result<CleaningReport> {
    let reference: ArtifactRef = config.input_artifact.parse()?;
    let mut run = RunContext::start(JOB_TYPE, &config)?;

    info!("[data-cleaning] - Loading artifact from store");
    let input = run.use_artifact(store, &reference).await?;
    let raw = read_table(&input.path)?;

    let cleaned = clean_listings(&raw, config.price_range())?;

    let local_file = work_dir.join(CLEAN_SAMPLE_FILE);
    write_table(&cleaned, &local_file)?;

    info!("[data-cleaning] - Uploading cleaned data to store");
    let request = PublishRequest::new(
        config.output_artifact,
        config.output_type,
        config.output_description,
        &local_file,
    );
    let output = run.log_artifact(store, request).await?;

    let summary = RunSummary {
        rows_in: raw.height(),
        rows_out: cleaned.height(),
        rows_dropped: raw.height() - cleaned.height(),
    };
    run.finish(store, &summary).await?;

    Ok(CleaningReport {
        run_id: run.id(),
        input: input.version,
        output,
        rows_in: summary.rows_in,
        rows_out: summary.rows_out,
        local_file,
    })
}
