//! Transformation stage: raw ad groups on disk to a clean dataset.
//!
//! The input file is trusted only as far as being a JSON array. Groups that
//! aren't arrays are skipped with a warning, bad ads inside a group are
//! skipped by the normalizer, and every candidate that fails validation is
//! written to the validation report instead of the dataset.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

use crate::dedup::deduplicate;
use crate::error::TransformError;
use crate::locator::RawAdGroup;
use crate::model::NormalizedAd;
use crate::normalizer::normalize_groups;
use crate::storage::{ArtifactKind, ArtifactStore};
use crate::validator::validate_all;

/// Parse the raw data file into ad groups.
pub fn load_raw_groups(input: &Path) -> Result<Vec<RawAdGroup>, TransformError> {
    let content = fs::read_to_string(input).map_err(|source| TransformError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|source| TransformError::Json {
        path: input.to_path_buf(),
        source,
    })?;

    let Value::Array(groups) = value else {
        return Err(TransformError::Shape(input.to_path_buf()));
    };

    let total = groups.len();
    let groups: Vec<RawAdGroup> = groups
        .into_iter()
        .enumerate()
        .filter_map(|(i, group)| match group {
            Value::Array(ads) => Some(ads),
            other => {
                warn!("Skipping ad group #{}: expected an array, got {}", i, other);
                None
            }
        })
        .collect();

    info!("Loaded {} of {} ad groups from {}", groups.len(), total, input.display());
    Ok(groups)
}

/// Run the transformation on `input` and return the dataset path.
pub fn transform_raw_data(input: &Path, store: &ArtifactStore) -> Result<PathBuf, TransformError> {
    info!("🔄 Transforming raw data from {}", input.display());

    let groups = load_raw_groups(input)?;
    let candidates = normalize_groups(&groups);
    let outcome = validate_all(candidates);

    let report_path = store.write_json(ArtifactKind::ValidationReport, &outcome.invalid)?;
    if !outcome.invalid.is_empty() {
        warn!(
            "{} ads failed validation, see {}",
            outcome.invalid.len(),
            report_path.display()
        );
    }

    let (ads, stats) = deduplicate(outcome.valid);
    info!(
        "Dataset has {} ads ({} validated before deduplication)",
        ads.len(),
        stats.input
    );

    let dataset_path = store.write_csv(ArtifactKind::Dataset, &NormalizedAd::CSV_HEADERS, &ads)?;
    Ok(dataset_path)
}
