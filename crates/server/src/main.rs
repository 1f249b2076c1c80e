//! artiscrape entry point.
//!
//! Loads configuration, then polls the configured Artifactory instance until
//! interrupted. Logging goes to stderr.

use anyhow::Result;
use artiscrape_client::ArtifactoryClient;
use artiscrape_core::{AppConfig, cache::spawn_pruner};
use std::sync::Arc;

mod logging;
mod poller;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    logging::init(&config);

    tracing::info!(
        scrape_uri = %config.scrape_uri,
        use_cache = config.use_cache,
        scrape_interval_ms = config.scrape_interval_ms,
        "starting artiscrape"
    );

    let client = Arc::new(ArtifactoryClient::new(&config)?);
    let pruner = spawn_pruner(client.cache().clone(), config.cache_prune_interval());
    let poller = poller::Poller::new(Arc::clone(&client), config.scrape_interval(), config.optional_metrics);

    tokio::select! {
        _ = poller.run() => {}
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!("shutting down");
        }
    }

    if let Some(pruner) = pruner {
        pruner.abort();
    }
    Ok(())
}
