// FILE: src/pipeline.rs
//! Pipeline: arrival -> classification -> handler, one entry at a time.
//!
//! Entries are processed strictly in order, so the exists-check-then-move in
//! the mover is never raced by a second handler. A stop request is only
//! honoured between entries; an entry that is already being handled is
//! finished first.

use crate::config::Config;
use crate::core::mover::{MoveOutcome, Mover};
use crate::core::permissions::{Identity, LibcChown, OwnershipChanger};
use crate::courier::{Courier, SmtpCourier};
use crate::engine::classifier::Classifier;
use crate::engine::dispatch::{Dispatcher, Handler, MovableEntry};
use crate::error::{Result, SortError};
use crate::librarian::Librarian;
use crate::oracle::{GeminiOracle, Oracle};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// What became of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Moved(PathBuf),
    /// Destination already existed; treated as already handled.
    Skipped(PathBuf),
    /// No usable category; the entry stays where it is.
    Dropped { label: String },
    /// Gone from the watch root before it could be handled.
    Vanished,
}

pub struct Pipeline {
    classifier: Classifier,
    dispatcher: Arc<Dispatcher>,
}

impl Pipeline {
    pub fn new(classifier: Classifier, dispatcher: Dispatcher) -> Self {
        Self {
            classifier,
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Wire the production collaborators from configuration.
    pub fn from_config(config: &Config) -> Self {
        let oracle: Arc<dyn Oracle> = Arc::new(GeminiOracle::new(
            config.genai_api_key.clone(),
            config.genai_model.clone(),
        ));
        let chown: Arc<dyn OwnershipChanger> = Arc::new(LibcChown);
        let courier = config
            .mail
            .clone()
            .map(|settings| Arc::new(SmtpCourier::new(settings)) as Arc<dyn Courier>);

        let mover = Mover::new(Identity::new(config.puid, config.pgid), chown);
        let dispatcher = Dispatcher::new(config.destinations.clone(), mover, courier);
        Self::new(Classifier::new(oracle), dispatcher)
    }

    /// Classify and finish a single entry.
    pub async fn process(&self, entry: MovableEntry) -> Result<EntryOutcome> {
        if entry.source_path.symlink_metadata().is_err() {
            tracing::debug!("[Pipeline] Entry vanished before handling: {}", entry.name);
            return Ok(EntryOutcome::Vanished);
        }

        let identification = self.classifier.identify_title(&entry.name).await;
        let handler = match Handler::resolve(&identification.classification) {
            Ok(handler) => handler,
            Err(e) => {
                tracing::warn!("[Pipeline] {} for entry: {}", e, entry.name);
                return Ok(EntryOutcome::Dropped {
                    label: identification.classification,
                });
            }
        };

        tracing::info!("[Pipeline] {} classified as {}", entry.name, handler.category());

        let dispatcher = Arc::clone(&self.dispatcher);
        let outcome = tokio::task::spawn_blocking(move || handler.handle(&dispatcher, &entry))
            .await
            .map_err(|e| SortError::Other(anyhow::anyhow!("dispatch task failed: {}", e)))??;

        Ok(match outcome {
            MoveOutcome::Moved(path) => EntryOutcome::Moved(path),
            MoveOutcome::Skipped(path) => EntryOutcome::Skipped(path),
        })
    }

    /// Drain `entries` until the channel closes or `shutdown` fires.
    pub async fn drain(
        &self,
        mut entries: mpsc::UnboundedReceiver<MovableEntry>,
        shutdown: CancellationToken,
    ) {
        loop {
            let entry = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::info!("[Pipeline] Stop requested");
                    break;
                }
                next = entries.recv() => match next {
                    Some(entry) => entry,
                    None => break,
                },
            };

            let name = entry.name.clone();
            if let Err(e) = self.process(entry).await {
                tracing::error!("[Pipeline] Failed to handle {}: {}", name, e);
            }
        }
    }

    /// Watch, process, and stop cleanly when `shutdown` fires.
    pub async fn run(&self, librarian: &mut Librarian, shutdown: CancellationToken) -> Result<()> {
        let entries = librarian.start()?;
        self.drain(entries, shutdown).await;
        librarian.stop();
        Ok(())
    }
}
