use edge_bouncer_application::ports::{Backend, DecisionFeed};
use edge_bouncer_application::SyncDecisionsUseCase;
use edge_bouncer_domain::{Config, Scope};
use edge_bouncer_infrastructure::cdn::{CdnBackend, HttpCdnApi};
use edge_bouncer_infrastructure::edgewaf::{EdgeWafBackend, HttpEdgeWafApi};
use edge_bouncer_infrastructure::fastly::{CleanupList, FastlyAclBackend, FastlyHttpClient};
use edge_bouncer_infrastructure::feed::CrowdsecStreamClient;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Wire the decision feed and every configured backend into the sync
/// use case. Backends are pluggable: only the config sections present
/// produce one.
pub fn build_sync(config: &Config, shutdown: CancellationToken) -> SyncDecisionsUseCase {
    let mut scopes = vec![Scope::Ip, Scope::Range];
    if config.fastly.is_some() {
        scopes.push(Scope::Country);
        scopes.push(Scope::As);
    }
    let feed: Arc<dyn DecisionFeed> = Arc::new(
        CrowdsecStreamClient::new(&config.decision_feed, config.update_frequency, &scopes)
            .with_cancellation(shutdown),
    );

    let mut backends: Vec<Arc<dyn Backend>> = Vec::new();
    if let Some(cdn) = &config.cdn {
        let api = Arc::new(HttpCdnApi::new(
            cdn.secret_id.clone(),
            cdn.secret_key.clone(),
        ));
        backends.push(Arc::new(CdnBackend::new(api, cdn.clone())));
    }
    if let Some(waf) = &config.waf {
        let api = Arc::new(HttpEdgeWafApi::new(
            waf.secret_id.clone(),
            waf.secret_key.clone(),
        ));
        backends.push(Arc::new(EdgeWafBackend::new(api, waf.clone())));
    }
    if let Some(fastly) = &config.fastly {
        let cleanup = Arc::new(CleanupList::new(fastly.cleanup_file.clone()));
        for (i, account) in fastly.accounts.iter().enumerate() {
            let api = Arc::new(FastlyHttpClient::new(
                account.account_token.clone(),
                Some(Arc::clone(&cleanup)),
            ));
            backends.push(Arc::new(FastlyAclBackend::new(
                format!("fastly-{i}"),
                api,
                account.services.clone(),
            )));
        }
    }
    info!(backends = backends.len(), "backends constructed");

    SyncDecisionsUseCase::new(feed, backends)
        .with_recovery_delay(Duration::from_secs(config.recovery_delay))
}
