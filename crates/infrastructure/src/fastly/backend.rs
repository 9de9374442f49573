use async_trait::async_trait;
use edge_bouncer_application::ports::Backend;
use edge_bouncer_domain::config::FastlyServiceConfig;
use edge_bouncer_domain::{Action, BanList, BouncerError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::api::FastlyApi;
use super::service::FastlyService;

/// Projects the ban set onto every configured service of one account.
///
/// Infrastructure setup (version clone, ACL fleet, VCL install) is lazy:
/// it runs on the first real apply, so a dry run never mutates the
/// account. Setup is all-or-nothing; a partial failure is retried from
/// scratch on the next tick.
pub struct FastlyAclBackend {
    name: String,
    api: Arc<dyn FastlyApi>,
    service_configs: Vec<FastlyServiceConfig>,
    services: Mutex<Vec<FastlyService>>,
}

impl FastlyAclBackend {
    pub fn new(
        name: String,
        api: Arc<dyn FastlyApi>,
        service_configs: Vec<FastlyServiceConfig>,
    ) -> Self {
        Self {
            name,
            api,
            service_configs,
            services: Mutex::new(Vec::new()),
        }
    }

    /// Newest decision wins when the feed carries a value twice.
    fn decision_map(ban_list: &BanList) -> HashMap<String, Action> {
        let mut map = HashMap::new();
        for entry in ban_list {
            map.entry(entry.value.clone()).or_insert(entry.action);
        }
        map
    }
}

#[async_trait]
impl Backend for FastlyAclBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn precheck(&self) -> Result<(), BouncerError> {
        for config in &self.service_configs {
            let versions = self.api.list_versions(&config.service_id).await.map_err(|e| {
                BouncerError::Preflight(format!(
                    "fastly service {}: {e}",
                    config.service_id
                ))
            })?;
            if versions.is_empty() {
                return Err(BouncerError::Preflight(format!(
                    "fastly service {} not found",
                    config.service_id
                )));
            }
        }
        Ok(())
    }

    async fn apply(&self, ban_list: &BanList) -> Result<bool, BouncerError> {
        let mut services = self.services.lock().await;
        if services.is_empty() {
            info!(backend = %self.name, "setting up fastly infrastructure");
            let mut fresh = Vec::with_capacity(self.service_configs.len());
            for config in &self.service_configs {
                fresh.push(FastlyService::setup(Arc::clone(&self.api), config).await?);
            }
            *services = fresh;
        }

        let decisions = Self::decision_map(ban_list);
        for service in services.iter_mut() {
            service.transform_state(&decisions).await?;
        }
        Ok(true)
    }
}
