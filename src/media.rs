// FILE: src/media.rs
//! The closed set of media categories a download can be routed to.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaCategory {
    Movie,
    TvShow,
    Audiobook,
    Ebook,
}

impl MediaCategory {
    /// Every category, in prompt order.
    pub const ALL: [MediaCategory; 4] = [
        MediaCategory::Movie,
        MediaCategory::TvShow,
        MediaCategory::Audiobook,
        MediaCategory::Ebook,
    ];

    /// Canonical lowercase label, shared by the prompt and the response matcher.
    pub fn label(self) -> &'static str {
        match self {
            MediaCategory::Movie => "movie",
            MediaCategory::TvShow => "tv show",
            MediaCategory::Audiobook => "audiobook",
            MediaCategory::Ebook => "ebook",
        }
    }

    /// Case-insensitive lookup. Anything outside the canonical set (including
    /// the "unknown" sentinel) yields `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim().to_lowercase();
        Self::ALL.into_iter().find(|c| c.label() == wanted)
    }
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
