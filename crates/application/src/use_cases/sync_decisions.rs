use crate::ports::{Backend, DecisionFeed};
use edge_bouncer_domain::{BouncerError, DecisionLedger};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Counters for one synchronization tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub deleted: usize,
    pub added: usize,
    pub applied: usize,
    pub failed: usize,
}

/// Use case: fold pending feed batches into the ledger and project the
/// resulting ban set onto every configured backend.
///
/// Owns the ledger; runs on the single control task. Should be driven
/// periodically (see `DecisionSyncJob`).
pub struct SyncDecisionsUseCase {
    feed: Arc<dyn DecisionFeed>,
    backends: Vec<Arc<dyn Backend>>,
    ledger: DecisionLedger,
    recovery_delay: Duration,
}

impl SyncDecisionsUseCase {
    pub fn new(feed: Arc<dyn DecisionFeed>, backends: Vec<Arc<dyn Backend>>) -> Self {
        Self {
            feed,
            backends,
            ledger: DecisionLedger::new(),
            recovery_delay: Duration::from_secs(30),
        }
    }

    pub fn with_recovery_delay(mut self, delay: Duration) -> Self {
        self.recovery_delay = delay;
        self
    }

    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }

    /// Startup probes: feed first, then every backend. Any failure is
    /// fatal to the caller.
    pub async fn preflight(&self) -> Result<(), BouncerError> {
        self.feed.precheck().await?;
        for backend in &self.backends {
            debug!(backend = backend.name(), "running preflight check");
            backend.precheck().await?;
        }
        Ok(())
    }

    /// Start the feed's background poller.
    pub async fn start_feed(&self) {
        self.feed.run().await;
    }

    pub fn feed_running(&self) -> bool {
        self.feed.is_running()
    }

    /// One tick: drain deletions, then additions; if anything changed,
    /// snapshot the ledger and fan out to all backends concurrently.
    ///
    /// A failing backend is logged and sleeps the recovery delay inside
    /// its own branch; it never stops the other backends or the loop.
    pub async fn execute(&mut self) -> SyncStats {
        let deleted_batch = self.feed.drain_deleted().await;
        let added_batch = self.feed.drain_added().await;

        let deleted = self.ledger.apply_deletions(&deleted_batch);
        let new_values: Vec<String> =
            added_batch.iter().map(|d| d.value.clone()).collect();
        let added = self.ledger.apply_additions(added_batch);

        let mut stats = SyncStats {
            deleted,
            added,
            ..SyncStats::default()
        };

        if deleted == 0 && added == 0 {
            debug!("no decision changes, skipping backend fan-out");
            return stats;
        }

        info!(
            added,
            deleted,
            total = self.ledger.len(),
            "decision set changed:\n{}",
            new_values.join("\n")
        );

        let ban_list = Arc::new(self.ledger.snapshot());
        let recovery_delay = self.recovery_delay;
        let outcomes = join_all(self.backends.iter().map(|backend| {
            let backend = Arc::clone(backend);
            let ban_list = Arc::clone(&ban_list);
            async move {
                match backend.apply(&ban_list).await {
                    Ok(_) => true,
                    Err(e) => {
                        error!(
                            backend = backend.name(),
                            error = %e,
                            transient = e.is_transient(),
                            "backend apply failed"
                        );
                        tokio::time::sleep(recovery_delay).await;
                        false
                    }
                }
            }
        }))
        .await;

        stats.applied = outcomes.iter().filter(|ok| **ok).count();
        stats.failed = outcomes.len() - stats.applied;
        stats
    }
}
