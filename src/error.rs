//! Error taxonomy for the crawl and transformation stages.
//!
//! Transient conditions (marker not rendered yet, spinner still visible) are
//! never errors at the pipeline level; they surface here only so the retry
//! loop can tell them apart from failures that must stop it.

use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by a browser page session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("navigation to {url} failed: {source}")]
    Navigation {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("browser operation failed: {0}")]
    Browser(#[from] anyhow::Error),
}

/// Outcome of one extraction pass over the rendered page.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The marker object is not in the page yet. Retryable.
    #[error("init data `{0}` not found")]
    MarkerNotFound(&'static str),

    #[error("marker object has no search_results_connection.edges")]
    MissingEdges,

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ExtractError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExtractError::MarkerNotFound(_))
    }
}

/// Fatal collection failure. Aborts the run.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("timed out or failed navigating to {url}")]
    Navigation {
        url: String,
        #[source]
        source: SessionError,
    },

    #[error("browser session failed: {0}")]
    Session(#[from] SessionError),

    #[error("failed to persist raw data: {0}")]
    Persist(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write csv {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Fatal failure of the transformation stage (bad input file).
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("input file not found or unreadable: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in input file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("input file {0} is not an array of ad groups")]
    Shape(PathBuf),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to read dataset {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Per-ad failure inside the normalizer. The ad is skipped, siblings proceed.
#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("raw ad is not a JSON object")]
    NotAnObject,
}
