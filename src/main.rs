// src/main.rs

use anyhow::Result;
use mediasort::librarian::Librarian;
use mediasort::{Config, Pipeline};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("mediasort starting up...");

    // Fail fast: a missing oracle credential (or folder) ends the process here.
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            return Err(e.into());
        }
    };
    tracing::debug!("Configuration: {:?}", config);

    for category in mediasort::MediaCategory::ALL {
        let root = config.destinations.root(category);
        if !root.is_dir() {
            tracing::warn!("Destination for {} does not exist: {}", category, root.display());
        }
    }

    let pipeline = Pipeline::from_config(&config);
    let mut librarian = Librarian::new(config.watch_folder.clone(), config.watch_mode);

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Interrupt received, finishing current entry...");
                signal.cancel();
            }
            Err(e) => tracing::error!("Unable to listen for interrupt: {}", e),
        }
    });

    pipeline.run(&mut librarian, shutdown).await?;

    tracing::info!("mediasort shutting down...");
    Ok(())
}
