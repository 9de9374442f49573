use edge_bouncer_application::SyncDecisionsUseCase;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Periodic control loop: starts the feed poller, waits one tick so the
/// first stream poll can hydrate the ledger, then synchronizes every
/// `interval_secs` until cancelled or the feed stops.
pub struct DecisionSyncJob {
    sync: SyncDecisionsUseCase,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl DecisionSyncJob {
    pub fn new(sync: SyncDecisionsUseCase) -> Self {
        Self {
            sync,
            interval_secs: 10,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, interval_secs: u64) -> Self {
        self.interval_secs = interval_secs.max(1);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub async fn start(mut self) -> JoinHandle<()> {
        info!(
            interval_secs = self.interval_secs,
            backends = self.sync.backend_count(),
            "Starting decision sync job"
        );

        tokio::spawn(async move {
            self.sync.start_feed().await;

            let mut interval =
                tokio::time::interval(Duration::from_secs(self.interval_secs));
            // consume the immediate tick: the first sync runs one period
            // after the poller started, once hydration had a chance
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("DecisionSyncJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let stats = self.sync.execute().await;
                        if stats.added > 0 || stats.deleted > 0 {
                            info!(
                                added = stats.added,
                                deleted = stats.deleted,
                                applied = stats.applied,
                                failed = stats.failed,
                                "decision sync tick completed"
                            );
                        }
                        if !self.sync.feed_running() {
                            warn!("decision feed stopped, exiting sync loop");
                            break;
                        }
                    }
                }
            }
        })
    }
}
