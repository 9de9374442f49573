use async_trait::async_trait;
use edge_bouncer_domain::{BanList, BouncerError};

/// A remote edge surface the current ban set is projected onto.
///
/// Implementations live in the infrastructure layer and own whatever
/// rule/ACL state they cache between ticks. Cached state must only be
/// updated after the corresponding remote call succeeded.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Read-only startup probe: credentials valid, target exists.
    /// A missing target (domain/zone/service) is fatal.
    async fn precheck(&self) -> Result<(), BouncerError>;

    /// Idempotently project `ban_list` onto the remote surface.
    ///
    /// Returns `true` on success, including the no-op case where the
    /// surface already matches. Transient failures are returned as
    /// errors and retried by the control loop on a later tick.
    async fn apply(&self, ban_list: &BanList) -> Result<bool, BouncerError>;
}
