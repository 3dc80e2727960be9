// src/ingest/types.rs
use serde::{Deserialize, Serialize};

pub const UNKNOWN_FEED: &str = "Unknown feed";
pub const UNTITLED: &str = "Untitled";

/// One normalized feed entry, ready for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedItem {
    pub source: String,       // feed title, or "Unknown feed"
    pub title: String,        // item headline, or "Untitled"
    pub body: String,         // sanitized plain text, <= 180 chars, may be empty
    pub link: Option<String>, // canonical item URL
    pub timestamp: i64,       // epoch millis; 0 = unknown (sorts as oldest)
    /// Relative label computed once at parse time ("5m ago"). Goes stale if kept around.
    pub time: String,
}

/// Per-source item lists, sources with zero items already dropped.
pub type FeedBatch = Vec<Vec<FeedItem>>;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FeedError {
    /// Document is unusable even structurally.
    #[error("feed parse failure: {0}")]
    Parse(String),

    /// Every retrieval strategy failed for one source.
    #[error("all retrieval strategies failed for {url}. Last error: {last_error}")]
    Exhausted { url: String, last_error: String },

    #[error("status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("cannot build locator: {0}")]
    Locator(String),
}

/// Stable newest-first ordering; unknown timestamps (0) end up last.
pub fn sort_newest_first(items: &mut [FeedItem]) {
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}
