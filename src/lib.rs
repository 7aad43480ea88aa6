//! mediasort: routes finished downloads into a media library.
//!
//! A single-process service built from a few small parts:
//! - Librarian (watcher - reports arrivals in the downloads folder)
//! - Classifier (asks the Oracle what each arrival is)
//! - Dispatch (moves it to the right library folder, mails ebooks)

pub mod config;
pub mod core;
pub mod courier;
pub mod engine;
pub mod error;
pub mod librarian;
pub mod media;
pub mod oracle;
pub mod pipeline;

pub use config::{Config, Destinations, MailSettings, WatchMode};
pub use error::{Result, SortError};
pub use media::MediaCategory;
pub use pipeline::{EntryOutcome, Pipeline};
