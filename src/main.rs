mod config;
mod crawler;
mod dedup;
mod error;
mod interceptor;
mod lang;
mod locator;
mod logging;
mod model;
mod normalizer;
mod report;
mod session;
mod stealth;
mod storage;
mod transform;
mod validator;
mod worker;

use std::path::Path;

use clap::Parser;
use tracing::{error, info};

use crate::config::{DATA_DIR, LOG_DIR};
use crate::storage::ArtifactStore;

/// Scrape an Ad Library search, clean the ads and report the longest-running ones.
#[derive(Parser, Debug)]
#[command(name = "adlib-crawler", version)]
struct Cli {
    /// Ad Library search results URL
    url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_path = logging::init(Path::new(LOG_DIR))?;
    info!("Logging to {}", log_path.display());

    let store = ArtifactStore::new(DATA_DIR);
    info!("Writing artifacts under {}", store.root().display());
    match worker::run_pipeline(&cli.url, &store).await {
        Ok(output) => {
            info!(
                "🏁 Done. Raw data: {}, dataset: {}, report: {}",
                output.raw_data.display(),
                output.dataset.display(),
                output.report.display()
            );
            Ok(())
        }
        Err(e) => {
            error!("❌ Pipeline failed: {:#}", e);
            Err(e)
        }
    }
}
