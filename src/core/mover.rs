// FILE: src/core/mover.rs
//! Mover: relocates one arrival into its destination root.
//!
//! Never overwrites. An existing destination means the entry was already
//! handled, so the move is skipped rather than failed.

use crate::core::permissions::{Identity, OwnershipChanger};
use crate::error::{Result, SortError};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved(PathBuf),
    /// Destination already present (or being written by another handler).
    Skipped(PathBuf),
}

pub struct Mover {
    identity: Identity,
    chown: Arc<dyn OwnershipChanger>,
    in_flight: Mutex<HashSet<PathBuf>>,
}

/// Releases a destination claim when dropped.
struct Claim<'a> {
    set: &'a Mutex<HashSet<PathBuf>>,
    path: PathBuf,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.path);
    }
}

impl Mover {
    pub fn new(identity: Identity, chown: Arc<dyn OwnershipChanger>) -> Self {
        Self {
            identity,
            chown,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    fn claim(&self, destination: &Path) -> Option<Claim<'_>> {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(destination.to_path_buf()) {
            return None;
        }
        Some(Claim {
            set: &self.in_flight,
            path: destination.to_path_buf(),
        })
    }

    /// Re-own `source` (best effort), then move it to `destination`.
    pub fn move_entry(&self, source: &Path, destination: &Path) -> Result<MoveOutcome> {
        let Some(_claim) = self.claim(destination) else {
            tracing::warn!(
                "[Mover] Another handler is already writing {}, skipping",
                destination.display()
            );
            return Ok(MoveOutcome::Skipped(destination.to_path_buf()));
        };

        if destination.symlink_metadata().is_ok() {
            tracing::warn!(
                "[Mover] Destination already exists, skipping: {}",
                destination.display()
            );
            return Ok(MoveOutcome::Skipped(destination.to_path_buf()));
        }

        if source.symlink_metadata().is_err() {
            return Err(SortError::Move {
                from: source.to_path_buf(),
                to: destination.to_path_buf(),
                reason: "source no longer exists".into(),
            });
        }

        if !self.identity.is_empty() {
            if let Err(e) = self.chown.chown_recursive(source, self.identity) {
                tracing::warn!(
                    "[Mover] Error changing ownership for {}: {}",
                    source.display(),
                    e
                );
            }
        }

        move_tree(source, destination).map_err(|e| SortError::Move {
            from: source.to_path_buf(),
            to: destination.to_path_buf(),
            reason: e.to_string(),
        })?;

        tracing::info!(
            "[Mover] Moved {} to {}",
            source.display(),
            destination.display()
        );
        Ok(MoveOutcome::Moved(destination.to_path_buf()))
    }
}

/// Rename, or copy-then-delete when the rename crosses filesystems.
fn move_tree(source: &Path, destination: &Path) -> io::Result<()> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(rename_err) if rename_err.raw_os_error() != Some(libc::EXDEV) => Err(rename_err),
        Err(rename_err) => {
            tracing::debug!(
                "[Mover] Rename failed ({}), falling back to copy",
                rename_err
            );
            copy_then_remove(source, destination)
        }
    }
}

/// The cross-device half of a move. Once the copy is complete the move counts
/// as done; a source that cannot be removed afterwards is only reported.
fn copy_then_remove(source: &Path, destination: &Path) -> io::Result<()> {
    if let Err(copy_err) = copy_tree(source, destination) {
        // Leave the source intact; drop the partial copy.
        if let Err(cleanup_err) = remove_any(destination) {
            tracing::warn!(
                "[Mover] Partial copy left at {} ({}); later arrivals with this name will be skipped",
                destination.display(),
                cleanup_err
            );
        }
        return Err(copy_err);
    }

    if let Err(cleanup_err) = remove_any(source) {
        tracing::warn!(
            "[Mover] Copied {} to {}, source cleanup failed: {}",
            source.display(),
            destination.display(),
            cleanup_err
        );
    }
    Ok(())
}

fn copy_tree(source: &Path, destination: &Path) -> io::Result<()> {
    if !source.is_dir() {
        fs::copy(source, destination)?;
        return Ok(());
    }

    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_symlink() {
            let link = fs::read_link(entry.path())?;
            std::os::unix::fs::symlink(link, &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn remove_any(path: &Path) -> io::Result<()> {
    match path.symlink_metadata() {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
