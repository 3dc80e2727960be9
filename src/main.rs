//! feed-river: binary entrypoint
//! Loads config, fetches every configured feed and prints the normalized batch
//! as JSON. With `refresh_secs > 0` it keeps refetching and prints each new batch.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feed_river::config::river::{load_river_config_default, RiverConfig};
use feed_river::drift::{run_frames, DriftController};
use feed_river::ingest::scheduler::{spawn_refresh_scheduler, BatchSlot, RefreshSchedulerCfg};
use feed_river::ingest::{sort_newest_first, FeedBatch, FeedFetcher};

/// Approximate card width used to size preview containers.
const PREVIEW_CARD_PX: i64 = 320;

/// `RIVER_LOG_FORMAT=json` switches to JSON lines; filter via `RUST_LOG`.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("feed_river=info,warn"));

    let json = std::env::var("RIVER_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

/// Print a batch newest-first per source, or the empty state.
fn report(batch: &FeedBatch) -> anyhow::Result<()> {
    if batch.is_empty() {
        tracing::warn!("no feed produced any items");
        println!("No feeds available right now.");
        return Ok(());
    }

    let mut sorted = batch.clone();
    for items in &mut sorted {
        sort_newest_first(items);
        tracing::info!(source = %items[0].source, items = items.len(), "feed ready");
    }
    let out = serde_json::to_string_pretty(&sorted).context("serializing batch")?;
    println!("{out}");
    Ok(())
}

/// Optional headless drift preview: `RIVER_DRIFT_PREVIEW_FRAMES=N`.
async fn preview_drift(cfg: &RiverConfig, batch: &FeedBatch) {
    let frames = std::env::var("RIVER_DRIFT_PREVIEW_FRAMES")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0);
    if frames == 0 || batch.is_empty() {
        return;
    }

    let mut drift = DriftController::from_config(&cfg.drift);
    for items in batch {
        drift.add_container(items.len() as i64 * PREVIEW_CARD_PX);
    }
    drift.set_flow_all(true);
    run_frames(&mut drift, cfg.drift.frame(), frames).await;

    for (id, items) in drift.container_ids().zip(batch) {
        if let Some(c) = drift.container(id) {
            tracing::info!(
                target: "drift",
                source = %items[0].source,
                offset = c.offset,
                max_offset = c.max_offset,
                "drift preview"
            );
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = load_river_config_default().context("loading river config")?;
    let fetcher = Arc::new(FeedFetcher::from_config(&cfg).context("building feed fetcher")?);
    tracing::info!(
        feeds = cfg.feeds.len(),
        strategies = fetcher.strategies().len(),
        refresh_secs = cfg.refresh_secs,
        "feed-river starting"
    );

    if cfg.refresh_secs == 0 {
        let batch = fetcher.fetch_all_feeds(&cfg.feeds).await;
        report(&batch)?;
        preview_drift(&cfg, &batch).await;
        return Ok(());
    }

    let slot = Arc::new(BatchSlot::new());
    let mut rx = slot.subscribe();
    let handle = spawn_refresh_scheduler(
        fetcher,
        cfg.feeds.clone(),
        slot,
        RefreshSchedulerCfg {
            interval_secs: cfg.refresh_secs,
        },
    );

    loop {
        tokio::select! {
            changed = rx.changed() => {
                changed.context("refresh scheduler stopped")?;
                let published = rx.borrow_and_update().clone();
                report(&published.batch)?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                handle.abort();
                return Ok(());
            }
        }
    }
}
