// FILE: src/config.rs
//! Process configuration, loaded once from the environment at startup.
//!
//! Nothing here is global: `main` builds a [`Config`] and hands it to the
//! pipeline, which passes the relevant pieces down to each component.

use crate::error::{Result, SortError};
use crate::media::MediaCategory;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

/// Which arrivals in the watch root the librarian reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    /// Only folder-per-item deliveries.
    DirectoriesOnly,
    /// Folders and bare files alike.
    AnyEntry,
}

impl WatchMode {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "directories" | "dirs" | "directories_only" => Ok(WatchMode::DirectoriesOnly),
            "any" | "all" | "any_entry" => Ok(WatchMode::AnyEntry),
            other => Err(SortError::Config(format!(
                "WATCH_MODE must be 'directories' or 'any', got '{}'",
                other
            ))),
        }
    }
}

/// One destination root per category. Immutable once built.
#[derive(Debug, Clone)]
pub struct Destinations {
    pub movies: PathBuf,
    pub shows: PathBuf,
    pub audiobooks: PathBuf,
    pub ebooks: PathBuf,
}

impl Destinations {
    pub fn root(&self, category: MediaCategory) -> &Path {
        match category {
            MediaCategory::Movie => &self.movies,
            MediaCategory::TvShow => &self.shows,
            MediaCategory::Audiobook => &self.audiobooks,
            MediaCategory::Ebook => &self.ebooks,
        }
    }
}

/// Everything needed to mail an ebook to a reading device.
#[derive(Clone)]
pub struct MailSettings {
    pub recipient: String,
    pub sender: String,
    pub password: String,
    pub smtp_host: String,
}

impl std::fmt::Debug for MailSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailSettings")
            .field("recipient", &self.recipient)
            .field("sender", &self.sender)
            .field("password", &"<redacted>")
            .field("smtp_host", &self.smtp_host)
            .finish()
    }
}

#[derive(Clone)]
pub struct Config {
    pub genai_api_key: String,
    pub genai_model: String,
    pub watch_folder: PathBuf,
    pub destinations: Destinations,
    pub puid: Option<u32>,
    pub pgid: Option<u32>,
    /// `None` when any of the three mail variables is missing.
    pub mail: Option<MailSettings>,
    pub watch_mode: WatchMode,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("genai_api_key", &"<redacted>")
            .field("genai_model", &self.genai_model)
            .field("watch_folder", &self.watch_folder)
            .field("destinations", &self.destinations)
            .field("puid", &self.puid)
            .field("pgid", &self.pgid)
            .field("mail", &self.mail)
            .field("watch_mode", &self.watch_mode)
            .finish()
    }
}

impl Config {
    /// Load from the process environment, after merging an optional `.env`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| SortError::Config(format!("{} is not set", key)))
        };

        // The oracle credential is checked first: it is the fail-fast contract.
        let genai_api_key = get("GENAI_API_KEY").ok_or_else(|| {
            SortError::Config(
                "API key for Generative AI is not set. Please configure GENAI_API_KEY.".into(),
            )
        })?;

        let destinations = Destinations {
            movies: require("MOVIES_FOLDER")?.into(),
            shows: require("SHOWS_FOLDER")?.into(),
            audiobooks: require("AUDIOBOOKS_FOLDER")?.into(),
            ebooks: require("EBOOKS_FOLDER")?.into(),
        };

        let mail = match (get("KINDLE_EMAIL"), get("FROM_EMAIL"), get("FROM_EMAIL_PASSWORD")) {
            (Some(recipient), Some(sender), Some(password)) => Some(MailSettings {
                recipient,
                sender,
                password,
                smtp_host: get("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
            }),
            _ => None,
        };

        let watch_mode = match get("WATCH_MODE") {
            Some(raw) => WatchMode::parse(&raw)?,
            None => WatchMode::AnyEntry,
        };

        Ok(Self {
            genai_api_key,
            genai_model: get("GENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            watch_folder: require("WATCH_FOLDER")?.into(),
            destinations,
            puid: parse_id("PUID", get("PUID"))?,
            pgid: parse_id("PGID", get("PGID"))?,
            mail,
            watch_mode,
        })
    }
}

fn parse_id(key: &str, raw: Option<String>) -> Result<Option<u32>> {
    raw.map(|v| {
        v.trim()
            .parse::<u32>()
            .map_err(|_| SortError::Config(format!("{} must be a numeric id, got '{}'", key, v)))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("GENAI_API_KEY", "secret"),
            ("WATCH_FOLDER", "/downloads/complete"),
            ("MOVIES_FOLDER", "/media/movies"),
            ("SHOWS_FOLDER", "/media/shows"),
            ("AUDIOBOOKS_FOLDER", "/media/audiobooks"),
            ("EBOOKS_FOLDER", "/media/ebooks"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<Config> {
        Config::from_lookup(|key| env.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.genai_model, DEFAULT_MODEL);
        assert_eq!(config.watch_mode, WatchMode::AnyEntry);
        assert!(config.mail.is_none());
        assert_eq!(config.puid, None);
        assert_eq!(
            config.destinations.root(MediaCategory::TvShow),
            Path::new("/media/shows")
        );
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let mut env = base_env();
        env.remove("GENAI_API_KEY");
        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("GENAI_API_KEY"));

        env.insert("GENAI_API_KEY", "   ");
        assert!(load(&env).is_err());
    }

    #[test]
    fn test_mail_requires_all_three_settings() {
        let mut env = base_env();
        env.insert("KINDLE_EMAIL", "reader@kindle.com");
        env.insert("FROM_EMAIL", "me@example.com");
        assert!(load(&env).unwrap().mail.is_none());

        env.insert("FROM_EMAIL_PASSWORD", "hunter2");
        let mail = load(&env).unwrap().mail.unwrap();
        assert_eq!(mail.recipient, "reader@kindle.com");
        assert_eq!(mail.smtp_host, DEFAULT_SMTP_HOST);
        assert!(!format!("{:?}", mail).contains("hunter2"));
    }

    #[test]
    fn test_ids_and_watch_mode_parse() {
        let mut env = base_env();
        env.insert("PUID", "1000");
        env.insert("PGID", "");
        env.insert("WATCH_MODE", "Directories");
        let config = load(&env).unwrap();
        assert_eq!(config.puid, Some(1000));
        assert_eq!(config.pgid, None);
        assert_eq!(config.watch_mode, WatchMode::DirectoriesOnly);

        env.insert("PUID", "abc");
        assert!(load(&env).is_err());
        env.insert("PUID", "1000");
        env.insert("WATCH_MODE", "sometimes");
        assert!(load(&env).is_err());
    }
}
