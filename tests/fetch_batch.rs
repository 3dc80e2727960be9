// tests/fetch_batch.rs
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use feed_river::ingest::fetch::{FeedFetcher, FeedTransport, Fetched, RetrievalStrategy};
use feed_river::ingest::types::FeedError;

const ATOM_XML: &str = include_str!("fixtures/atom_summary.xml");
const RSS_XML: &str = include_str!("fixtures/rss_content_encoded.xml");
const EMPTY_RSS: &str = "<rss><channel><title>Quiet</title></channel></rss>";

/// Per-URL body (None = unreachable) plus a latency, tracking peak concurrency.
struct SlowTransport {
    routes: HashMap<String, (Option<&'static str>, Duration)>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl SlowTransport {
    fn new(routes: Vec<(&str, Option<&'static str>, u64)>) -> Arc<Self> {
        Arc::new(Self {
            routes: routes
                .into_iter()
                .map(|(u, b, ms)| (u.to_string(), (b, Duration::from_millis(ms))))
                .collect(),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl FeedTransport for SlowTransport {
    async fn get(&self, locator: &str) -> Result<Fetched, FeedError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let (body, delay) = self
            .routes
            .get(locator)
            .cloned()
            .unwrap_or((None, Duration::ZERO));
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match body {
            Some(b) => Ok(Fetched {
                status: 200,
                body: b.to_string(),
            }),
            None => Err(FeedError::Transport("unreachable".into())),
        }
    }
}

fn urls(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test(start_paused = true)]
async fn failed_source_is_dropped_and_order_follows_input() {
    // The first source answers last; order must still follow the input list.
    let transport = SlowTransport::new(vec![
        ("https://a.test/atom", Some(ATOM_XML), 300),
        ("https://b.test/down", None, 10),
        ("https://c.test/rss", Some(RSS_XML), 20),
    ]);
    let fetcher = FeedFetcher::new(vec![RetrievalStrategy::Direct], transport.clone());

    let batch = fetcher
        .fetch_all_feeds(&urls(&["https://a.test/atom", "https://b.test/down", "https://c.test/rss"]))
        .await;

    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0][0].source, "Example Atom Blog");
    assert_eq!(batch[1][0].source, "World News Desk");
    assert_eq!(transport.peak.load(Ordering::SeqCst), 3, "requests should overlap");
}

#[tokio::test(start_paused = true)]
async fn requests_overlap_in_time() {
    let transport = SlowTransport::new(vec![
        ("https://a.test/atom", Some(ATOM_XML), 1_000),
        ("https://c.test/rss", Some(RSS_XML), 1_000),
    ]);
    let fetcher = FeedFetcher::new(vec![RetrievalStrategy::Direct], transport);

    let t0 = tokio::time::Instant::now();
    let batch = fetcher
        .fetch_all_feeds(&urls(&["https://a.test/atom", "https://c.test/rss"]))
        .await;
    assert_eq!(batch.len(), 2);
    assert!(t0.elapsed() < Duration::from_millis(1_500));
}

#[tokio::test]
async fn empty_feeds_are_dropped_too() {
    let transport = SlowTransport::new(vec![
        ("https://q.test/rss", Some(EMPTY_RSS), 0),
        ("https://c.test/rss", Some(RSS_XML), 0),
    ]);
    let fetcher = FeedFetcher::new(vec![RetrievalStrategy::Direct], transport);
    let batch = fetcher
        .fetch_all_feeds(&urls(&["https://q.test/rss", "https://c.test/rss"]))
        .await;
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].len(), 3);
}

#[tokio::test]
async fn all_sources_failing_is_an_empty_batch() {
    let transport = SlowTransport::new(vec![]);
    let fetcher = FeedFetcher::new(vec![RetrievalStrategy::Direct], transport);
    let batch = fetcher
        .fetch_all_feeds(&urls(&["https://x.test/1", "https://y.test/2"]))
        .await;
    assert!(batch.is_empty());
    assert!(fetcher.fetch_all_feeds(&[]).await.is_empty());
}
