// FILE: src/librarian.rs
//! Librarian: watches the "downloads complete" folder for arrivals.
//!
//! Only direct children of the watch root count. Each creation event becomes
//! a [`MovableEntry`] on a channel; the pipeline drains that channel one
//! entry at a time.

use crate::config::WatchMode;
use crate::engine::dispatch::MovableEntry;
use crate::error::Result;
use notify::event::CreateKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Stopped,
    Running,
}

pub struct Librarian {
    root: PathBuf,
    mode: WatchMode,
    watcher: Option<RecommendedWatcher>,
}

impl Librarian {
    pub fn new(root: impl Into<PathBuf>, mode: WatchMode) -> Self {
        Self {
            root: root.into(),
            mode,
            watcher: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state(&self) -> WatcherState {
        if self.watcher.is_some() {
            WatcherState::Running
        } else {
            WatcherState::Stopped
        }
    }

    /// Subscribe to the watch root. Restarting a running librarian replaces
    /// the old subscription (and closes its channel).
    pub fn start(&mut self) -> Result<mpsc::UnboundedReceiver<MovableEntry>> {
        self.stop();

        let (tx, rx) = mpsc::unbounded_channel();
        let root = self.root.clone();
        let mode = self.mode;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for entry in arrivals(&event, &root, mode) {
                        tracing::info!("[Librarian] New entry detected: {}", entry.name);
                        if tx.send(entry).is_err() {
                            tracing::debug!("[Librarian] Receiver gone, dropping event");
                        }
                    }
                }
                Err(e) => tracing::error!("[Librarian] Watch error: {}", e),
            },
            notify::Config::default(),
        )?;
        watcher.watch(&self.root, RecursiveMode::NonRecursive)?;

        self.watcher = Some(watcher);
        tracing::info!(
            "[Librarian] Monitoring '{}' for new entries ({:?})",
            self.root.display(),
            self.mode
        );
        Ok(rx)
    }

    /// Unsubscribe. Dropping the watcher closes the event channel.
    pub fn stop(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            if let Err(e) = watcher.unwatch(&self.root) {
                tracing::debug!("[Librarian] Unwatch failed: {}", e);
            }
            tracing::info!("[Librarian] Stopped watching '{}'", self.root.display());
        }
    }
}

impl Drop for Librarian {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The entries a single notify event announces, after filtering.
fn arrivals(event: &Event, root: &Path, mode: WatchMode) -> Vec<MovableEntry> {
    let EventKind::Create(kind) = event.kind else {
        return Vec::new();
    };

    event
        .paths
        .iter()
        .filter(|path| path.parent() == Some(root))
        .filter_map(|path| {
            let mut entry = MovableEntry::from_path(path)?;
            entry.is_directory = entry.is_directory || kind == CreateKind::Folder;
            if mode == WatchMode::DirectoriesOnly && !entry.is_directory {
                tracing::debug!("[Librarian] Ignoring file (directories only): {}", entry.name);
                return None;
            }
            Some(entry)
        })
        .collect()
}
