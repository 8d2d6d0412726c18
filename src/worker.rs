use std::path::PathBuf;

use anyhow::Context;
use tracing::info;

use crate::crawler;
use crate::report;
use crate::storage::ArtifactStore;
use crate::transform;

/// Paths produced by one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub raw_data: PathBuf,
    pub dataset: PathBuf,
    pub report: PathBuf,
}

/// Collect, transform and report for a single Ad Library search URL.
/// Any stage failure stops the run.
pub async fn run_pipeline(url: &str, store: &ArtifactStore) -> anyhow::Result<PipelineOutput> {
    info!("🚀 Starting pipeline for {}", url);

    let raw_data = crawler::collect_raw_data(url, store)
        .await
        .context("collecting raw data failed")?;
    info!("✅ Raw data saved to {}", raw_data.display());

    let dataset = transform::transform_raw_data(&raw_data, store).context("transforming raw data failed")?;
    info!("✅ Transformed data saved to {}", dataset.display());

    let report = report::generate_report(&dataset, store).context("generating report failed")?;
    info!("✅ Report saved to {}", report.display());

    Ok(PipelineOutput {
        raw_data,
        dataset,
        report,
    })
}
