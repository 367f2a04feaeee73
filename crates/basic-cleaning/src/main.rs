use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use basic_cleaning_core::store::LocalArtifactStore;
use basic_cleaning_core::{run_basic_cleaning, CleaningConfig};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_STORE_DIR: &str = "artifacts";

/// Download the raw dataset artifact, apply basic data cleaning, and publish
/// the result as a new artifact.
#[derive(Parser, Debug)]
#[command(author, version, about = "A very basic data cleaning", long_about = None)]
struct Cli {
    /// Input artifact with raw data (name, name:vN or name:alias)
    #[arg(long = "input_artifact")]
    input_artifact: String,

    /// Output artifact with clean data
    #[arg(long = "output_artifact")]
    output_artifact: String,

    /// Type of output data artifact
    #[arg(long = "output_type")]
    output_type: String,

    /// Description of the output artifact
    #[arg(long = "output_description")]
    output_description: String,

    /// Minimum room/apartment price to remove outliers
    #[arg(long = "min_price", allow_negative_numbers = true)]
    min_price: f64,

    /// Maximum room/apartment price to remove outliers
    #[arg(long = "max_price", allow_negative_numbers = true)]
    max_price: f64,
}

impl From<Cli> for CleaningConfig {
    fn from(cli: Cli) -> Self {
        CleaningConfig {
            input_artifact: cli.input_artifact,
            output_artifact: cli.output_artifact,
            output_type: cli.output_type,
            output_description: cli.output_description,
            min_price: cli.min_price,
            max_price: cli.max_price,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Before the subscriber so `.env` can set `RUST_LOG`.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let store_dir = store_dir();
    let store = LocalArtifactStore::open(&store_dir)
        .await
        .with_context(|| format!("failed to open artifact store at {}", store_dir.display()))?;
    let work_dir = env::current_dir().context("failed to resolve working directory")?;

    let report = run_basic_cleaning(&store, cli.into(), &work_dir)
        .await
        .context("basic cleaning run failed")?;

    info!(
        run_id = %report.run_id,
        input = %report.input,
        output = %report.output,
        rows_in = report.rows_in,
        rows_out = report.rows_out,
        "basic cleaning complete"
    );
    Ok(())
}

fn store_dir() -> PathBuf {
    env::var("ARTIFACT_STORE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_STORE_DIR))
}
