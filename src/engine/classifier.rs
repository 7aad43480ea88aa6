// FILE: src/engine/classifier.rs
//! Classifier: asks the oracle what a download is, and reads the answer
//! leniently.
//!
//! The oracle is told to reply with exactly one fenced ```json block, but it
//! may add prose, emit several blocks, emit none, or emit garbage inside one.
//! Every well-formed block becomes a record; every broken one is logged and
//! skipped.

use crate::media::MediaCategory;
use crate::oracle::Oracle;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::{Arc, LazyLock};

/// Label reported when the oracle gave nothing usable.
pub const UNKNOWN_LABEL: &str = "unknown";

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```\s*json(.*?)\s*```").expect("fenced block pattern is valid")
});

/// One (title, classification) pair as the oracle stated it. The
/// classification is unchecked and may not be a known category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRecord {
    pub title: Option<String>,
    pub classification: String,
}

impl ClassificationRecord {
    /// Any JSON object with a string `classification`. The title is
    /// informational: numbers and booleans are stringified, anything else
    /// (null, missing, nested) becomes `None`. Repeated keys keep the last value.
    fn from_object(object: &Map<String, Value>) -> Option<Self> {
        let classification = object.get("classification")?.as_str()?.to_string();
        let title = match object.get("title") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(v @ (Value::Number(_) | Value::Bool(_))) => Some(v.to_string()),
            _ => None,
        };
        Some(Self {
            title,
            classification,
        })
    }
}

/// Result of identifying a single entry name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identification {
    pub title: Option<String>,
    pub classification: String,
}

impl Identification {
    fn unknown() -> Self {
        Self {
            title: None,
            classification: UNKNOWN_LABEL.to_string(),
        }
    }

    /// The category this identification maps to, if any.
    pub fn category(&self) -> Option<MediaCategory> {
        MediaCategory::from_label(&self.classification)
    }
}

/// `'movie', 'tv show', 'audiobook', or 'ebook'`
pub fn category_list() -> String {
    let quoted: Vec<String> = MediaCategory::ALL
        .iter()
        .map(|c| format!("'{}'", c.label()))
        .collect();
    match quoted.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{}, or {}", rest.join(", "), last),
        Some((last, _)) => last.clone(),
        None => String::new(),
    }
}

pub fn build_prompt(title: &str) -> String {
    let categories = category_list();
    format!(
        "Classify the following title as {categories}:\n\n{title}\n\n\
         Respond only with a single ```json fenced code block containing one JSON object \
         with the keys \"title\" and \"classification\", where classification is one of \
         {categories}. Do not write anything outside the code block."
    )
}

/// Contents of every ```json fenced block in `text`, trimmed, in order.
pub fn fenced_json_blocks(text: &str) -> impl Iterator<Item = &str> {
    FENCED_JSON
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Parse every fenced block; malformed ones are logged and dropped.
pub fn parse_records(text: &str) -> Vec<ClassificationRecord> {
    let mut records = Vec::new();
    for block in fenced_json_blocks(text) {
        let object = match serde_json::from_str::<Map<String, Value>>(block) {
            Ok(object) => object,
            Err(e) => {
                tracing::warn!("[Classifier] Malformed JSON found in response ({}): {}", e, block);
                continue;
            }
        };
        match ClassificationRecord::from_object(&object) {
            Some(record) => {
                tracing::debug!("[Classifier] Parsed record: {:?}", record);
                records.push(record);
            }
            None => {
                tracing::warn!("[Classifier] Block has no string classification: {}", block);
            }
        }
    }
    records
}

pub struct Classifier {
    oracle: Arc<dyn Oracle>,
}

impl Classifier {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }

    /// Classify a batch of titles. A failing oracle call costs only that
    /// title its records; the rest of the batch still runs.
    pub async fn classify(&self, titles: &[&str]) -> Vec<ClassificationRecord> {
        let mut results = Vec::new();
        for title in titles {
            let prompt = build_prompt(title);
            tracing::debug!("[Classifier] Prompt: {}", prompt);

            match self.oracle.generate(&prompt).await {
                Ok(response) => {
                    tracing::debug!("[Classifier] Response: {}", response);
                    results.extend(parse_records(&response));
                }
                Err(e) => {
                    tracing::error!("[Classifier] Error processing title '{}': {}", title, e);
                }
            }
        }
        results
    }

    /// Identify one entry name. Only the first record counts; the rest are
    /// logged as discarded.
    pub async fn identify_title(&self, name: &str) -> Identification {
        let mut records = self.classify(&[name]).await.into_iter();

        let Some(first) = records.next() else {
            tracing::warn!("[Classifier] Failed to classify: {}", name);
            return Identification::unknown();
        };

        for extra in records {
            tracing::warn!(
                "[Classifier] Ambiguous answer for '{}': discarding extra record {:?}",
                name,
                extra
            );
        }

        Identification {
            title: first.title,
            classification: first.classification,
        }
    }
}
