use async_trait::async_trait;
use edge_bouncer_application::ports::DecisionFeed;
use edge_bouncer_domain::config::DecisionFeedConfig;
use edge_bouncer_domain::{BouncerError, Decision, Scope};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::wire::StreamBatch;
use crate::http::send_with_retry;

struct FeedShared {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    scopes: String,
    origins: Vec<String>,
    interval: Duration,
    added: Mutex<Vec<Decision>>,
    deleted: Mutex<Vec<Decision>>,
    running: AtomicBool,
}

/// `DecisionFeed` implementation polling a CrowdSec-style Local API.
pub struct CrowdsecStreamClient {
    shared: Arc<FeedShared>,
    started: AtomicBool,
    shutdown: CancellationToken,
}

impl CrowdsecStreamClient {
    pub fn new(config: &DecisionFeedConfig, interval_secs: u64, scopes: &[Scope]) -> Self {
        let mut api_url = config.api_url.clone();
        if !api_url.ends_with('/') {
            api_url.push('/');
        }
        let scopes = scopes
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            shared: Arc::new(FeedShared {
                http,
                api_url,
                api_key: config.api_key.clone(),
                scopes,
                origins: config.origins.clone(),
                interval: Duration::from_secs(interval_secs.max(1)),
                added: Mutex::new(Vec::new()),
                deleted: Mutex::new(Vec::new()),
                running: AtomicBool::new(false),
            }),
            started: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }
}

impl FeedShared {
    /// One poll of the stream endpoint; batches land in the drain queues.
    async fn poll_once(&self, startup: bool) -> Result<(), BouncerError> {
        let url = format!(
            "{}v1/decisions/stream?startup={}&scopes={}",
            self.api_url, startup, self.scopes
        );
        let request = self
            .http
            .get(&url)
            .header("X-Api-Key", self.api_key.as_str());
        let response = send_with_retry(request, "lapi:stream").await?;
        let batch: StreamBatch = response
            .json()
            .await
            .map_err(|e| BouncerError::Feed(format!("bad stream body: {e}")))?;

        let deleted: Vec<Decision> = batch
            .deleted
            .unwrap_or_default()
            .into_iter()
            .filter_map(|d| d.into_domain(&self.origins))
            .collect();
        let new: Vec<Decision> = batch
            .new
            .unwrap_or_default()
            .into_iter()
            .filter_map(|d| d.into_domain(&self.origins))
            .collect();

        if !deleted.is_empty() {
            self.deleted.lock().await.extend(deleted);
        }
        if !new.is_empty() {
            self.added.lock().await.extend(new);
        }
        Ok(())
    }
}

#[async_trait]
impl DecisionFeed for CrowdsecStreamClient {
    /// Read-only credential probe, same call the query client would make.
    async fn precheck(&self) -> Result<(), BouncerError> {
        let url = format!("{}v1/decisions?ip=1.1.1.1", self.shared.api_url);
        let request = self
            .shared
            .http
            .get(&url)
            .header("X-Api-Key", self.shared.api_key.as_str());
        send_with_retry(request, "lapi:decisions")
            .await
            .map_err(|e| BouncerError::Feed(format!("decision feed precheck: {e}")))?;
        Ok(())
    }

    async fn run(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let shared = Arc::clone(&self.shared);
        let shutdown = self.shutdown.clone();
        shared.running.store(true, Ordering::SeqCst);
        info!(interval_secs = shared.interval.as_secs(), "starting decision feed poller");

        tokio::spawn(async move {
            let mut startup = true;
            let mut interval = tokio::time::interval(shared.interval);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("decision feed poller: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        match shared.poll_once(startup).await {
                            Ok(()) => {
                                debug!("decision feed poll completed");
                                startup = false;
                            }
                            Err(e) => {
                                warn!(error = %e, "decision feed poll failed");
                            }
                        }
                    }
                }
            }
            shared.running.store(false, Ordering::SeqCst);
        });
    }

    async fn drain_added(&self) -> Vec<Decision> {
        std::mem::take(&mut *self.shared.added.lock().await)
    }

    async fn drain_deleted(&self) -> Vec<Decision> {
        std::mem::take(&mut *self.shared.deleted.lock().await)
    }

    fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }
}
