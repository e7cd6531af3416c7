use crate::domain::model::RunSummary;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    /// Runs extract, transform and load. An empty extract ends the run early
    /// without writing anything.
    pub async fn run(&self) -> Result<RunSummary> {
        let started = Instant::now();
        tracing::info!("🚀 Starting ETL process...");

        // Extract
        let records = self.pipeline.extract().await?;
        tracing::info!("📥 Extracted {} listings", records.len());

        if records.is_empty() {
            tracing::info!("ℹ️ No listings found for the given parameters, nothing to write");
            return Ok(RunSummary::default());
        }
        let count = records.len();

        // Transform
        let transformed = self.pipeline.transform(records).await?;
        tracing::info!(
            "🔄 Transformed into {} raw / {} clean / {} requested rows",
            transformed.raw.len(),
            transformed.clean.len(),
            transformed.requested.len()
        );

        // Load
        let outputs = self.pipeline.load(transformed).await?;
        tracing::info!("💾 Load finished in {:.2?}", started.elapsed());

        Ok(RunSummary {
            records: count,
            outputs,
        })
    }
}
