//! Read-only link-substitution dictionary backed by the `words` collection.
//!
//! Each document maps a key word to a url; message renderers substitute
//! occurrences of the key with a markdown link. The dictionary is loaded
//! once per session and never written from this engine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::common::StoreError;
use crate::kernel::{BaseDocumentStore, Query};

/// Root collection holding dictionary documents.
pub const WORDS: &str = "words";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WordEntry {
    key: String,
    url: String,
}

/// key → url lookup, session-scoped.
#[derive(Debug, Clone, Default)]
pub struct WordDirectory {
    entries: HashMap<String, String>,
}

impl WordDirectory {
    /// Loads the full dictionary.
    pub async fn load(store: &dyn BaseDocumentStore) -> Result<Self, StoreError> {
        let snapshots = store.query(WORDS, Query::new()).await?;
        let mut entries = HashMap::new();
        for snapshot in &snapshots {
            let entry: WordEntry = snapshot.decode(WORDS)?;
            entries.insert(entry.key, entry.url);
        }
        info!(words = entries.len(), "Word dictionary loaded");
        Ok(Self { entries })
    }

    pub fn url_for(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replaces dictionary words in `content` with markdown links.
    /// Substitution is token-wise on whitespace boundaries.
    pub fn linkify(&self, content: &str) -> String {
        content
            .split_whitespace()
            .map(|token| match self.entries.get(token) {
                Some(url) => format!("[{token}]({url})"),
                None => token.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
