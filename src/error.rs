//! Error types for mediasort

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SortError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("Ownership error: {0}")]
    Ownership(String),

    #[error("Unknown media category: {0}")]
    UnknownCategory(String),

    #[error("Failed to move {} to {}: {reason}", from.display(), to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },

    #[error("Watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SortError>;
