// FILE: src/core/permissions.rs
//! Ownership normalisation for arrivals.
//!
//! Download clients usually write as their own user. Before an entry is
//! handed to the media library it is re-owned (recursively, like
//! `chown -R`) to the configured PUID/PGID.

use crate::error::{Result, SortError};
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use walkdir::WalkDir;

/// Target owner. Either half may be unset, meaning "leave as is".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity {
    pub uid: Option<u32>,
    pub gid: Option<u32>,
}

impl Identity {
    pub fn new(uid: Option<u32>, gid: Option<u32>) -> Self {
        Self { uid, gid }
    }

    /// Nothing to change at all.
    pub fn is_empty(&self) -> bool {
        self.uid.is_none() && self.gid.is_none()
    }
}

/// The privileged "change owner" capability, injected so tests never need root.
pub trait OwnershipChanger: Send + Sync {
    fn chown_recursive(&self, path: &Path, identity: Identity) -> Result<()>;
}

/// In-process `lchown` over the whole tree. Symlinks are re-owned
/// themselves, never followed.
#[derive(Debug, Default, Clone, Copy)]
pub struct LibcChown;

impl LibcChown {
    fn chown_one(path: &Path, identity: Identity) -> Result<()> {
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| SortError::Ownership(format!("Path contains null byte: {}", e)))?;

        // (uid_t)-1 / (gid_t)-1 leave that half untouched
        let uid = identity.uid.unwrap_or(u32::MAX) as libc::uid_t;
        let gid = identity.gid.unwrap_or(u32::MAX) as libc::gid_t;

        let result = unsafe { libc::lchown(c_path.as_ptr(), uid, gid) };
        if result == 0 {
            Ok(())
        } else {
            let err = std::io::Error::last_os_error();
            Err(SortError::Ownership(format!(
                "chown failed on {}: {}",
                path.display(),
                err
            )))
        }
    }
}

impl OwnershipChanger for LibcChown {
    fn chown_recursive(&self, path: &Path, identity: Identity) -> Result<()> {
        if identity.is_empty() {
            return Ok(());
        }
        if path.symlink_metadata().is_err() {
            return Err(SortError::Ownership(format!(
                "File does not exist: {}",
                path.display()
            )));
        }

        for entry in WalkDir::new(path).follow_links(false) {
            let entry = entry.map_err(|e| SortError::Ownership(e.to_string()))?;
            Self::chown_one(entry.path(), identity)?;
        }

        tracing::info!("[Permissions] Ownership changed for: {}", path.display());
        Ok(())
    }
}
