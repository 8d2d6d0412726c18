use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use chrono::{DateTime, Local};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::config::LOG_FILE_PREFIX;

/// `<dir>/adlib-crawler_<YYYY-mm-dd_HH-MM>.log`
pub fn log_file_path(dir: &Path, at: DateTime<Local>) -> PathBuf {
    dir.join(format!("{}_{}.log", LOG_FILE_PREFIX, at.format("%Y-%m-%d_%H-%M")))
}

/// Install console and file logging at INFO. Returns the log file path.
pub fn init(dir: &Path) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create log directory {}", dir.display()))?;

    let path = log_file_path(dir, Local::now());
    let file = File::options()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_target(false).with_ansi(false).with_writer(Mutex::new(file)))
        .with(LevelFilter::INFO)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(path)
}
