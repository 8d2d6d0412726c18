use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::info;

use crate::error::StorageError;

/// Every file a run leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Collected ad groups, exactly as the feed delivered them.
    RawData,
    /// Records that failed validation, with reasons.
    ValidationReport,
    /// Validated, deduplicated dataset.
    Dataset,
    /// Ranked top-ads report.
    Report,
}

impl ArtifactKind {
    fn dir(self) -> &'static str {
        match self {
            ArtifactKind::RawData => "raw",
            ArtifactKind::ValidationReport => "validation",
            ArtifactKind::Dataset => "transformed",
            ArtifactKind::Report => "reports",
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            ArtifactKind::RawData => "ad_library_raw",
            ArtifactKind::ValidationReport => "validation_report",
            ArtifactKind::Dataset => "ads_clean",
            ArtifactKind::Report => "top_ads_report",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            ArtifactKind::RawData | ArtifactKind::ValidationReport => "json",
            ArtifactKind::Dataset | ArtifactKind::Report => "csv",
        }
    }
}

/// Local file storage for run artifacts.
///
/// Files are written once, in place, to `<root>/<kind dir>/<prefix>_<YYYYmmdd_HHMMSS>.<ext>`.
/// Two runs only collide if they write the same kind within the same second.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn timestamped_path(&self, kind: ArtifactKind, at: DateTime<Local>) -> PathBuf {
        let timestamp = at.format("%Y%m%d_%H%M%S");
        self.root
            .join(kind.dir())
            .join(format!("{}_{}.{}", kind.prefix(), timestamp, kind.extension()))
    }

    fn create(&self, kind: ArtifactKind) -> Result<(PathBuf, File), StorageError> {
        let path = self.timestamped_path(kind, Local::now());
        let io_err = |source| StorageError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = File::create(&path).map_err(io_err)?;
        Ok((path, file))
    }

    /// Pretty-printed JSON artifact.
    pub fn write_json<T: Serialize + ?Sized>(&self, kind: ArtifactKind, value: &T) -> Result<PathBuf, StorageError> {
        let (path, file) = self.create(kind)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value).map_err(|source| StorageError::Json {
            path: path.clone(),
            source,
        })?;
        writer.flush().map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;

        info!("💾 Saved {:?} to {}", kind, path.display());
        Ok(path)
    }

    /// CSV artifact. The header row is always written, even for zero rows.
    pub fn write_csv<T: Serialize>(
        &self,
        kind: ArtifactKind,
        headers: &[&str],
        rows: &[T],
    ) -> Result<PathBuf, StorageError> {
        let (path, file) = self.create(kind)?;
        let csv_err = |source| StorageError::Csv {
            path: path.clone(),
            source,
        };

        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(headers).map_err(csv_err)?;
        for row in rows {
            writer.serialize(row).map_err(csv_err)?;
        }
        writer.flush().map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;

        info!("💾 Saved {} rows of {:?} to {}", rows.len(), kind, path.display());
        Ok(path)
    }
}
