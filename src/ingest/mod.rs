// src/ingest/mod.rs
pub mod fetch;
pub mod parser;
pub mod sanitize;
pub mod scheduler;
pub mod timefmt;
pub mod types;
pub mod xml;

pub use fetch::{FeedFetcher, FeedTransport, Fetched, HttpTransport, RetrievalStrategy};
pub use parser::{parse_feed, parse_feed_at, Dialect};
pub use sanitize::sanitize;
pub use timefmt::{format_time_ago, format_time_ago_at, parse_timestamp_ms};
pub use types::{sort_newest_first, FeedBatch, FeedError, FeedItem};

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up once a recorder is installed).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "feed_items_parsed_total",
            "Items produced by the feed normalizer."
        );
        describe_histogram!("feed_parse_ms", "Feed parse time in milliseconds.");
        describe_counter!(
            "feed_fetch_attempts_total",
            "Retrieval strategy attempts (direct or relay)."
        );
        describe_counter!(
            "feed_fetch_failures_total",
            "Retrieval strategy attempts that failed (transport, status or parse)."
        );
        describe_counter!(
            "feed_sources_failed_total",
            "Sources dropped from a batch after every strategy failed."
        );
        describe_gauge!(
            "feed_batch_sources_kept",
            "Sources with at least one item in the last batch."
        );
        describe_counter!("feed_refresh_runs_total", "Completed refresh cycles.");
        describe_counter!(
            "drift_resumes_total",
            "Drift resumes fired after a quiet period."
        );
    });
}
