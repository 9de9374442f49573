use async_trait::async_trait;
use edge_bouncer_domain::{BouncerError, Decision};

/// Streaming source of `added` / `deleted` decision batches.
///
/// The implementation polls on its own task; the control loop only ever
/// talks to it through the drain methods, so no mutable state is shared.
#[async_trait]
pub trait DecisionFeed: Send + Sync {
    /// Read-only startup probe of the feed API.
    async fn precheck(&self) -> Result<(), BouncerError>;

    /// Start the background poller. Idempotent.
    async fn run(&self);

    /// Take all decisions added since the last drain.
    async fn drain_added(&self) -> Vec<Decision>;

    /// Take all decisions deleted since the last drain.
    async fn drain_deleted(&self) -> Vec<Decision>;

    /// False once the poller has stopped (shutdown or fatal feed error).
    fn is_running(&self) -> bool;
}
