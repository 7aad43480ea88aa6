// FILE: src/engine/dispatch.rs
//! Handler registry: from a category to "what finishing this entry means".
//!
//! Movies, shows and audiobooks are only moved. Ebooks are moved and then the
//! first `.epub` found is mailed to the reading device.

use crate::config::Destinations;
use crate::core::mover::{MoveOutcome, Mover};
use crate::courier::{Courier, Notification};
use crate::error::{Result, SortError};
use crate::media::MediaCategory;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

const EBOOK_EXTENSION: &str = "epub";

/// One thing that showed up in the watch root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovableEntry {
    pub source_path: PathBuf,
    pub name: String,
    pub is_directory: bool,
}

impl MovableEntry {
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().into_owned();
        Some(Self {
            source_path: path.to_path_buf(),
            name,
            is_directory: path.is_dir(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    Movie,
    TvShow,
    Audiobook,
    Ebook,
}

impl Handler {
    pub fn for_category(category: MediaCategory) -> Self {
        match category {
            MediaCategory::Movie => Handler::Movie,
            MediaCategory::TvShow => Handler::TvShow,
            MediaCategory::Audiobook => Handler::Audiobook,
            MediaCategory::Ebook => Handler::Ebook,
        }
    }

    /// Resolve a category label. Labels outside the canonical set are an error.
    pub fn resolve(label: &str) -> Result<Self> {
        MediaCategory::from_label(label)
            .map(Self::for_category)
            .ok_or_else(|| SortError::UnknownCategory(label.to_string()))
    }

    pub fn category(self) -> MediaCategory {
        match self {
            Handler::Movie => MediaCategory::Movie,
            Handler::TvShow => MediaCategory::TvShow,
            Handler::Audiobook => MediaCategory::Audiobook,
            Handler::Ebook => MediaCategory::Ebook,
        }
    }

    pub fn destination_path(self, destinations: &Destinations, entry_name: &str) -> PathBuf {
        destinations.root(self.category()).join(entry_name)
    }

    /// Finish one entry. Only an OS-level move failure is returned as an error.
    pub fn handle(self, dispatcher: &Dispatcher, entry: &MovableEntry) -> Result<MoveOutcome> {
        let destination = self.destination_path(&dispatcher.destinations, &entry.name);
        let outcome = dispatcher.mover.move_entry(&entry.source_path, &destination)?;

        if let (Handler::Ebook, MoveOutcome::Moved(moved)) = (self, &outcome) {
            dispatcher.deliver_ebook(moved);
        }
        Ok(outcome)
    }
}

/// Everything a handler needs to finish an entry. Built once, shared.
pub struct Dispatcher {
    destinations: Destinations,
    mover: Mover,
    courier: Option<Arc<dyn Courier>>,
}

impl Dispatcher {
    pub fn new(destinations: Destinations, mover: Mover, courier: Option<Arc<dyn Courier>>) -> Self {
        Self {
            destinations,
            mover,
            courier,
        }
    }

    pub fn destinations(&self) -> &Destinations {
        &self.destinations
    }

    pub fn dispatch(&self, category: MediaCategory, entry: &MovableEntry) -> Result<MoveOutcome> {
        Handler::for_category(category).handle(self, entry)
    }

    fn deliver_ebook(&self, moved: &Path) {
        let Some(book) = find_ebook(moved) else {
            tracing::debug!("[Dispatch] No .{} found in {}", EBOOK_EXTENSION, moved.display());
            return;
        };

        let Some(courier) = &self.courier else {
            tracing::error!("[Dispatch] Email configuration is incomplete.");
            return;
        };

        tracing::info!("[Dispatch] Sending email with attachment: {}", book.display());
        if let Err(e) = courier.send(&Notification::for_attachment(&book)) {
            tracing::error!("[Dispatch] Failed to send email: {}", e);
        }
    }
}

fn is_ebook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(EBOOK_EXTENSION))
}

/// The moved entry itself if it is an ebook file, otherwise the first ebook
/// file inside it (walked in name order).
pub fn find_ebook(path: &Path) -> Option<PathBuf> {
    if path.is_dir() {
        return WalkDir::new(path)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .find(|e| e.file_type().is_file() && is_ebook(e.path()))
            .map(|e| e.into_path());
    }
    if path.is_file() && is_ebook(path) {
        return Some(path.to_path_buf());
    }
    None
}
