use crate::DecisionSyncJob;
use tokio::task::JoinHandle;
use tracing::info;

/// Central orchestrator for background jobs.
///
/// Use the builder pattern to register jobs, then call `.start()` once.
///
/// # Example
///
/// ```rust,ignore
/// JobRunner::new()
///     .with_decision_sync(DecisionSyncJob::new(sync).with_interval(10))
///     .start()
///     .await;
/// ```
pub struct JobRunner {
    decision_sync: Option<DecisionSyncJob>,
}

impl JobRunner {
    pub fn new() -> Self {
        Self {
            decision_sync: None,
        }
    }

    pub fn with_decision_sync(mut self, job: DecisionSyncJob) -> Self {
        self.decision_sync = Some(job);
        self
    }

    /// Start all registered background jobs, returning their handles.
    pub async fn start(self) -> Vec<JoinHandle<()>> {
        info!("Starting background job runner");
        let mut handles = Vec::new();

        if let Some(job) = self.decision_sync {
            handles.push(job.start().await);
        }

        info!("All background jobs started");
        handles
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}
