//! The record of one pipeline execution: its configuration and the artifact
//! versions it consumed and produced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::artifact::{ArtifactRef, ArtifactVersion};
use crate::error::Result;
use crate::store::{ArtifactStore, FetchedArtifact, PublishRequest};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunContext {
    run_id: Uuid,
    job_type: String,
    config: serde_json::Value,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    inputs: Vec<ArtifactVersion>,
    outputs: Vec<ArtifactVersion>,
    summary: Option<serde_json::Value>,
}

impl RunContext {
    pub fn start(job_type: &str, config: &impl Serialize) -> Result<Self> {
        let run = Self {
            run_id: Uuid::new_v4(),
            job_type: job_type.to_string(),
            config: serde_json::to_value(config)?,
            started_at: Utc::now(),
            finished_at: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            summary: None,
        };
        info!(run_id = %run.run_id, job_type, "run started");
        Ok(run)
    }

    pub fn id(&self) -> Uuid {
        self.run_id
    }

    pub fn job_type(&self) -> &str {
        &self.job_type
    }

    pub fn config(&self) -> &serde_json::Value {
        &self.config
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn inputs(&self) -> &[ArtifactVersion] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ArtifactVersion] {
        &self.outputs
    }

    pub fn summary(&self) -> Option<&serde_json::Value> {
        self.summary.as_ref()
    }

    /// Fetch `reference` and record the resolved version as an input of this run.
    pub async fn use_artifact(
        &mut self,
        store: &dyn ArtifactStore,
        reference: &ArtifactRef,
    ) -> Result<FetchedArtifact> {
        info!(run_id = %self.run_id, artifact = %reference, "using artifact");
        let fetched = store.fetch(reference).await?;
        info!(
            run_id = %self.run_id,
            artifact = %fetched.version,
            path = %fetched.path.display(),
            "artifact resolved"
        );
        self.inputs.push(fetched.version.clone());
        Ok(fetched)
    }

    /// Publish a new artifact version stamped with this run as its producer.
    pub async fn log_artifact(
        &mut self,
        store: &dyn ArtifactStore,
        mut request: PublishRequest,
    ) -> Result<ArtifactVersion> {
        request.producer = Some(self.run_id);
        let published = store.publish(&request).await?;
        info!(run_id = %self.run_id, artifact = %published, "artifact logged");
        self.outputs.push(published.clone());
        Ok(published)
    }

    pub async fn finish(&mut self, store: &dyn ArtifactStore, summary: &impl Serialize) -> Result<()> {
        self.summary = Some(serde_json::to_value(summary)?);
        self.finished_at = Some(Utc::now());
        store.record_run(self).await?;
        info!(
            run_id = %self.run_id,
            inputs = self.inputs.len(),
            outputs = self.outputs.len(),
            "run finished"
        );
        Ok(())
    }
}
