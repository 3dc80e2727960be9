// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod drift;
pub mod ingest;
pub mod interaction;

// ---- Re-exports for stable public API ----
pub use crate::config::river::{load_river_config_default, RiverConfig};
pub use crate::drift::{ContainerId, DriftControl, DriftController, DriftState};
pub use crate::ingest::{
    parse_feed, sanitize, FeedBatch, FeedError, FeedFetcher, FeedItem, RetrievalStrategy,
};
pub use crate::interaction::{Interaction, InteractionRouter};
