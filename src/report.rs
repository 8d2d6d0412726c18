//! Top-ads report over the clean dataset.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::config::{AD_LIBRARY_BASE_URL, TOP_ADS_LIMIT};
use crate::error::ReportError;
use crate::model::{MediaMix, NormalizedAd};
use crate::storage::{ArtifactKind, ArtifactStore};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub ad_id: String,
    pub ad_link: String,
    pub is_active: bool,
    pub start_date: String,
    pub end_date: String,
    pub hours_passed: i64,
    pub media_mix: MediaMix,
    pub ad_text: String,
    pub ad_lang_code: String,
}

impl ReportRow {
    pub const CSV_HEADERS: [&'static str; 9] = [
        "ad_id",
        "ad_link",
        "is_active",
        "start_date",
        "end_date",
        "hours_passed",
        "media_mix",
        "ad_text",
        "ad_lang_code",
    ];
}

pub fn ad_link(ad_id: &str) -> String {
    format!("{}?id={}", AD_LIBRARY_BASE_URL, ad_id)
}

fn format_ts(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S+00:00").to_string())
        .unwrap_or_default()
}

fn active_seconds(ad: &NormalizedAd, now: DateTime<Utc>) -> i64 {
    ad.total_active_time_sec
        .unwrap_or_else(|| now.timestamp() - ad.start_date_ts)
}

fn hours_passed(seconds: i64) -> i64 {
    (seconds as f64 / 3600.0).round_ties_even() as i64
}

/// Active ads ranked by hours live, longest first, capped at the top ten.
pub fn build_report(ads: &[NormalizedAd], now: DateTime<Utc>) -> Vec<ReportRow> {
    let mut rows: Vec<ReportRow> = ads
        .iter()
        .filter(|ad| ad.is_active)
        .map(|ad| ReportRow {
            ad_id: ad.ad_id.clone(),
            ad_link: ad_link(&ad.ad_id),
            is_active: ad.is_active,
            start_date: format_ts(ad.start_date_ts),
            end_date: ad
                .end_date_ts
                .filter(|end| *end != ad.start_date_ts)
                .map(format_ts)
                .unwrap_or_default(),
            hours_passed: hours_passed(active_seconds(ad, now)),
            media_mix: ad.media_mix,
            ad_text: ad.ad_text.clone(),
            ad_lang_code: ad.ad_lang_code.clone(),
        })
        .collect();

    rows.sort_by(|a, b| b.hours_passed.cmp(&a.hours_passed));
    rows.truncate(TOP_ADS_LIMIT);
    rows
}

pub fn load_dataset(path: &Path) -> Result<Vec<NormalizedAd>, ReportError> {
    let read_err = |source| ReportError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(read_err)?;
    reader
        .deserialize()
        .collect::<Result<Vec<NormalizedAd>, _>>()
        .map_err(read_err)
}

/// Build the report from the dataset at `dataset` and return the report path.
pub fn generate_report(dataset: &Path, store: &ArtifactStore) -> Result<PathBuf, ReportError> {
    info!("📊 Generating report from {}", dataset.display());

    let ads = load_dataset(dataset)?;
    let rows = build_report(&ads, Utc::now());
    info!("Selected {} of {} ads for the report", rows.len(), ads.len());

    let path = store.write_csv(ArtifactKind::Report, &ReportRow::CSV_HEADERS, &rows)?;
    Ok(path)
}
