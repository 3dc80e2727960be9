// src/ingest/scheduler.rs
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::ingest::fetch::FeedFetcher;
use crate::ingest::types::FeedBatch;

#[derive(Clone, Copy, Debug)]
pub struct RefreshSchedulerCfg {
    pub interval_secs: u64,
}

/// A batch together with the fetch cycle that produced it.
#[derive(Debug, Clone, Default)]
pub struct Published {
    pub generation: u64,
    pub batch: Arc<FeedBatch>,
}

/// Latest-batch holder. Each fetch cycle takes a generation up front; a
/// finished cycle only replaces the published batch if nothing newer has
/// been accepted meanwhile. Superseded cycles still run to completion.
pub struct BatchSlot {
    issued: AtomicU64,
    tx: watch::Sender<Published>,
}

impl Default for BatchSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchSlot {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Published::default());
        Self {
            issued: AtomicU64::new(0),
            tx,
        }
    }

    /// Start a cycle.
    pub fn begin(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Publish `batch` for `generation`. Returns false (and drops the batch)
    /// when a newer cycle already published.
    pub fn offer(&self, generation: u64, batch: FeedBatch) -> bool {
        let mut batch = Some(batch);
        self.tx.send_if_modified(|current| {
            if generation <= current.generation {
                return false;
            }
            *current = Published {
                generation,
                batch: Arc::new(batch.take().unwrap_or_default()),
            };
            true
        })
    }

    pub fn current(&self) -> Published {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Published> {
        self.tx.subscribe()
    }
}

/// Run one full fetch cycle and publish its batch. Returns whether it was accepted.
pub async fn run_cycle(fetcher: &FeedFetcher, urls: &[String], slot: &BatchSlot) -> bool {
    let generation = slot.begin();
    let batch = fetcher.fetch_all_feeds(urls).await;
    let sources = batch.len();
    let accepted = slot.offer(generation, batch);
    if !accepted {
        tracing::debug!(target: "ingest", generation, "superseded fetch cycle discarded");
    }
    counter!("feed_refresh_runs_total").increment(1);
    tracing::info!(target: "ingest", generation, sources, accepted, "fetch cycle done");
    accepted
}

/// Spawn a scheduler that refetches every source on a fixed interval.
/// The first cycle runs immediately; a cycle that overruns the interval
/// delays the schedule rather than bunching refetches.
pub fn spawn_refresh_scheduler(
    fetcher: Arc<FeedFetcher>,
    urls: Vec<String>,
    slot: Arc<BatchSlot>,
    cfg: RefreshSchedulerCfg,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(cfg.interval_secs.max(1)));
        // A slow cycle pushes the next one back instead of triggering catch-up refetches.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            run_cycle(&fetcher, &urls, &slot).await;
        }
    })
}
