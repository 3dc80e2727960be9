// src/ingest/fetch.rs
//! Feed retrieval: ordered strategy fallback per source, concurrent batches.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use metrics::{counter, gauge};
use serde::{Deserialize, Serialize};

use crate::config::river::{HttpSettings, RiverConfig};
use crate::ingest::ensure_metrics_described;
use crate::ingest::parser::parse_feed;
use crate::ingest::types::{FeedBatch, FeedError, FeedItem};

fn default_relay_param() -> String {
    "url".to_string()
}

/// How a feed URL is turned into something we can GET.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetrievalStrategy {
    /// Request the feed URL itself.
    Direct,
    /// Ask a relay endpoint to fetch it: `{endpoint}?{param}={percent-encoded url}`.
    Relay {
        endpoint: String,
        #[serde(default = "default_relay_param")]
        param: String,
    },
}

impl RetrievalStrategy {
    pub fn relay(endpoint: &str) -> Self {
        RetrievalStrategy::Relay {
            endpoint: endpoint.to_string(),
            param: default_relay_param(),
        }
    }

    /// Build the locator for `url`. Pure; no I/O.
    pub fn locate(&self, url: &str) -> Result<String, FeedError> {
        let url = url.trim();
        match self {
            RetrievalStrategy::Direct => reqwest::Url::parse(url)
                .map(|u| u.to_string())
                .map_err(|e| FeedError::Locator(format!("{url}: {e}"))),
            RetrievalStrategy::Relay { endpoint, param } => {
                reqwest::Url::parse_with_params(endpoint, &[(param.as_str(), url)])
                    .map(|u| u.to_string())
                    .map_err(|e| FeedError::Locator(format!("{endpoint}: {e}")))
            }
        }
    }

    pub fn label(&self) -> &str {
        match self {
            RetrievalStrategy::Direct => "direct",
            RetrievalStrategy::Relay { endpoint, .. } => endpoint,
        }
    }
}

/// Raw response: status code and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub status: u16,
    pub body: String,
}

impl Fetched {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait FeedTransport: Send + Sync {
    async fn get(&self, locator: &str) -> Result<Fetched, FeedError>;
}

/// reqwest-backed transport used outside tests.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(settings: &HttpSettings) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| FeedError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedTransport for HttpTransport {
    async fn get(&self, locator: &str) -> Result<Fetched, FeedError> {
        let resp = self
            .client
            .get(locator)
            .send()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;

        let status = resp.status().as_u16();
        // Error bodies are never parsed, don't bother downloading them.
        if !resp.status().is_success() {
            return Ok(Fetched {
                status,
                body: String::new(),
            });
        }
        let body = resp
            .text()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;
        Ok(Fetched { status, body })
    }
}

pub struct FeedFetcher {
    strategies: Vec<RetrievalStrategy>,
    transport: Arc<dyn FeedTransport>,
}

impl FeedFetcher {
    pub fn new(strategies: Vec<RetrievalStrategy>, transport: Arc<dyn FeedTransport>) -> Self {
        Self {
            strategies,
            transport,
        }
    }

    /// HTTP fetcher using the configured strategies and client settings.
    pub fn from_config(cfg: &RiverConfig) -> Result<Self, FeedError> {
        let transport = HttpTransport::new(&cfg.http)?;
        Ok(Self::new(cfg.strategies.clone(), Arc::new(transport)))
    }

    pub fn strategies(&self) -> &[RetrievalStrategy] {
        &self.strategies
    }

    /// One strategy, start to finish: locate, GET, check status, parse.
    async fn attempt(
        &self,
        strategy: &RetrievalStrategy,
        url: &str,
    ) -> Result<Vec<FeedItem>, FeedError> {
        let locator = strategy.locate(url)?;
        let fetched = self.transport.get(&locator).await?;
        if !fetched.is_success() {
            return Err(FeedError::Status(fetched.status));
        }
        parse_feed(&fetched.body)
    }

    /// Try each strategy in order and return the first parsed success.
    ///
    /// Fails with [`FeedError::Exhausted`] carrying the last attempt's error;
    /// never turns total failure into an empty list.
    pub async fn fetch_feed(&self, url: &str) -> Result<Vec<FeedItem>, FeedError> {
        ensure_metrics_described();

        let mut last_error = String::from("no retrieval strategies configured");
        for strategy in &self.strategies {
            counter!("feed_fetch_attempts_total").increment(1);
            match self.attempt(strategy, url).await {
                Ok(items) => return Ok(items),
                Err(e) => {
                    counter!("feed_fetch_failures_total").increment(1);
                    tracing::debug!(
                        target: "ingest",
                        %url,
                        strategy = strategy.label(),
                        error = %e,
                        "retrieval strategy failed"
                    );
                    last_error = e.to_string();
                }
            }
        }

        Err(FeedError::Exhausted {
            url: url.to_string(),
            last_error,
        })
    }

    /// Fetch every source concurrently. Failed and empty sources are dropped;
    /// the rest keep their input order.
    pub async fn fetch_all_feeds(&self, urls: &[String]) -> FeedBatch {
        ensure_metrics_described();

        let per_source = join_all(urls.iter().map(|url| async move {
            match self.fetch_feed(url).await {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(target: "ingest", %url, error = %e, "feed failed");
                    counter!("feed_sources_failed_total").increment(1);
                    Vec::new()
                }
            }
        }))
        .await;

        let batch: FeedBatch = per_source
            .into_iter()
            .filter(|items| !items.is_empty())
            .collect();

        gauge!("feed_batch_sources_kept").set(batch.len() as f64);
        tracing::info!(
            target: "ingest",
            requested = urls.len(),
            kept = batch.len(),
            items = batch.iter().map(Vec::len).sum::<usize>(),
            "feed batch fetched"
        );
        batch
    }
}
