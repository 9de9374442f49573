use async_trait::async_trait;
use chrono::Utc;
use edge_bouncer_application::ports::Backend;
use edge_bouncer_domain::config::CdnConfig;
use edge_bouncer_domain::{BanList, BouncerError, DiscardLog, IpBlocklist, IpListBuilder};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use super::types::{DomainConfig, IpFilter, IpFilterRule};
use crate::tencent::TencentClient;

const API_SERVICE: &str = "cdn";
const API_VERSION: &str = "2018-06-06";

/// The two CDN API calls the backend needs; the HTTP implementation is
/// swapped for a mock in tests.
#[async_trait]
pub trait CdnApi: Send + Sync {
    async fn describe_domain_config(
        &self,
        domain: &str,
    ) -> Result<Option<DomainConfig>, BouncerError>;

    /// Push the whole IP-filter block; returns the remote request id.
    async fn modify_ip_filter(
        &self,
        domain: &str,
        filter: &IpFilter,
    ) -> Result<String, BouncerError>;
}

pub struct HttpCdnApi {
    client: TencentClient,
}

impl HttpCdnApi {
    pub fn new(secret_id: String, secret_key: String) -> Self {
        Self {
            client: TencentClient::new(secret_id, secret_key),
        }
    }
}

#[async_trait]
impl CdnApi for HttpCdnApi {
    async fn describe_domain_config(
        &self,
        domain: &str,
    ) -> Result<Option<DomainConfig>, BouncerError> {
        let payload = json!({
            "Offset": 0,
            "Limit": 1,
            "Filters": [{"Name": "domain", "Value": [domain]}],
        });
        let response = self
            .client
            .post_action(API_SERVICE, API_VERSION, "DescribeDomainsConfig", &payload)
            .await?;
        let Some(first) = response
            .get("Domains")
            .and_then(|d| d.as_array())
            .and_then(|d| d.first())
        else {
            return Ok(None);
        };
        let config: DomainConfig = serde_json::from_value(first.clone())
            .map_err(|e| BouncerError::RemoteValidation(format!("bad domain config: {e}")))?;
        Ok(Some(config))
    }

    async fn modify_ip_filter(
        &self,
        domain: &str,
        filter: &IpFilter,
    ) -> Result<String, BouncerError> {
        let value = serde_json::to_string(&json!({ "update": filter }))
            .map_err(|e| BouncerError::Io(e.to_string()))?;
        let payload = json!({
            "Domain": domain,
            "Route": "IpFilter",
            "Value": value,
        });
        let response = self
            .client
            .post_action(API_SERVICE, API_VERSION, "ModifyDomainConfig", &payload)
            .await?;
        Ok(response
            .get("RequestId")
            .and_then(|id| id.as_str())
            .unwrap_or_default()
            .to_string())
    }
}

/// Projects the ban set onto the one blacklist rule this bouncer owns,
/// identified by a remark prefix. All other rules are preserved and their
/// entries are excluded from the managed list so they never count twice
/// against the provider's entry cap.
pub struct CdnBackend {
    api: Arc<dyn CdnApi>,
    config: CdnConfig,
}

impl CdnBackend {
    pub fn new(api: Arc<dyn CdnApi>, config: CdnConfig) -> Self {
        Self { api, config }
    }

    fn is_managed(&self, rule: &IpFilterRule) -> bool {
        rule.filter_type == "blacklist"
            && rule
                .remark
                .to_lowercase()
                .starts_with(&self.config.rule_prefix.to_lowercase())
    }

    fn split_rules(&self, filter: &IpFilter) -> (Option<IpFilterRule>, Vec<IpFilterRule>) {
        let mut managed = None;
        let mut others = Vec::new();
        for rule in &filter.filter_rules {
            if managed.is_none() && self.is_managed(rule) {
                managed = Some(rule.clone());
            } else {
                others.push(rule.clone());
            }
        }
        (managed, others)
    }

    fn log_outcome(&self, remark: &str, blocklist: &IpBlocklist, discards: &DiscardLog) {
        info!(
            domain = %self.config.domain,
            blacklist = blocklist.len(),
            discarded = discards.len(),
            "applying decision set to CDN ip filter"
        );
        let mut message = remark.to_string();
        if !blocklist.is_empty() {
            message.push_str("\n===blacklist===\n");
            message.push_str(&blocklist.join("\n"));
        }
        if !discards.is_empty() {
            message.push_str("\n===discard===\n");
            for (ip, reason) in discards {
                message.push_str(&format!("{ip} {reason}\n"));
            }
        }
        info!("{message}");
    }
}

#[async_trait]
impl Backend for CdnBackend {
    fn name(&self) -> &str {
        "cdn"
    }

    async fn precheck(&self) -> Result<(), BouncerError> {
        match self.api.describe_domain_config(&self.config.domain).await? {
            Some(_) => Ok(()),
            None => Err(BouncerError::Preflight(format!(
                "cdn domain {} not found",
                self.config.domain
            ))),
        }
    }

    async fn apply(&self, ban_list: &BanList) -> Result<bool, BouncerError> {
        let domain = &self.config.domain;
        let Some(domain_config) = self.api.describe_domain_config(domain).await? else {
            warn!(domain = %domain, "cdn domain not found, skipping tick");
            return Ok(false);
        };

        let current_filter = domain_config.ip_filter.unwrap_or_default();
        let (managed, others) = self.split_rules(&current_filter);

        // Entries already blocked or allowed by foreign rules must not be
        // re-emitted: they are disjoint by provider contract and would
        // double-count against the entry cap.
        let mut other_blacklist_len = 0usize;
        let mut builder_ignore: Vec<&str> = Vec::new();
        for rule in &others {
            if rule.filter_type == "blacklist" {
                other_blacklist_len += rule.filters.len();
            }
            builder_ignore.extend(rule.filters.iter().map(String::as_str));
        }

        let capacity = self.config.max_entries.saturating_sub(other_blacklist_len);
        let mut builder = IpListBuilder::new(capacity);
        builder.add_ignore_many(builder_ignore);
        builder.add_many(ban_list.iter().map(|entry| entry.value.as_str()));
        let (blocklist, discards) = builder.finalize();

        let existing = managed.as_ref().map(|rule| rule.filters.clone()).unwrap_or_default();
        if existing == blocklist {
            info!(domain = %domain, "ip list unchanged, nothing to apply");
            return Ok(true);
        }

        let remark = format!("{} {}", self.config.rule_prefix, Utc::now().to_rfc3339());
        let managed_rule = IpFilterRule {
            filter_type: "blacklist".to_string(),
            filters: blocklist.clone(),
            remark: remark.clone(),
            rule_type: "all".to_string(),
            rule_paths: vec!["*".to_string()],
        };

        let mut rules = others;
        rules.push(managed_rule);
        let filter = IpFilter {
            switch: "on".to_string(),
            filter_type: "blacklist".to_string(),
            filter_rules: rules,
        };

        self.log_outcome(&remark, &blocklist, &discards);
        let request_id = self.api.modify_ip_filter(domain, &filter).await?;
        info!(domain = %domain, request_id = %request_id, "cdn ip filter updated");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edge_bouncer_domain::{Action, BanEntry};
    use std::sync::Mutex;

    struct MockCdnApi {
        config: Mutex<Option<DomainConfig>>,
        pushed: Mutex<Vec<IpFilter>>,
    }

    impl MockCdnApi {
        fn with_rules(rules: Vec<IpFilterRule>) -> Self {
            Self {
                config: Mutex::new(Some(DomainConfig {
                    domain: "cdn.example.com".to_string(),
                    ip_filter: Some(IpFilter {
                        switch: "on".to_string(),
                        filter_type: "blacklist".to_string(),
                        filter_rules: rules,
                    }),
                })),
                pushed: Mutex::new(Vec::new()),
            }
        }

        fn missing() -> Self {
            Self {
                config: Mutex::new(None),
                pushed: Mutex::new(Vec::new()),
            }
        }

        fn push_count(&self) -> usize {
            self.pushed.lock().unwrap().len()
        }

        fn last_pushed(&self) -> IpFilter {
            self.pushed.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl CdnApi for MockCdnApi {
        async fn describe_domain_config(
            &self,
            _domain: &str,
        ) -> Result<Option<DomainConfig>, BouncerError> {
            Ok(self.config.lock().unwrap().clone())
        }

        async fn modify_ip_filter(
            &self,
            _domain: &str,
            filter: &IpFilter,
        ) -> Result<String, BouncerError> {
            self.pushed.lock().unwrap().push(filter.clone());
            // keep the mock remote in sync so a second apply sees it
            let mut config = self.config.lock().unwrap();
            if let Some(config) = config.as_mut() {
                config.ip_filter = Some(filter.clone());
            }
            Ok("req-1".to_string())
        }
    }

    fn config() -> CdnConfig {
        CdnConfig {
            secret_id: "id".to_string(),
            secret_key: "key".to_string(),
            domain: "cdn.example.com".to_string(),
            rule_prefix: "crowdsec".to_string(),
            max_entries: 200,
        }
    }

    fn bans(values: &[&str]) -> BanList {
        values
            .iter()
            .map(|v| BanEntry {
                value: v.to_string(),
                action: Action::Ban,
            })
            .collect()
    }

    #[tokio::test]
    async fn writes_managed_rule_and_keeps_others() {
        let other = IpFilterRule {
            filter_type: "whitelist".to_string(),
            filters: vec!["203.0.113.1".to_string()],
            remark: "ops".to_string(),
            rule_type: "all".to_string(),
            rule_paths: vec!["*".to_string()],
        };
        let api = Arc::new(MockCdnApi::with_rules(vec![other.clone()]));
        let backend = CdnBackend::new(api.clone(), config());

        assert!(backend.apply(&bans(&["198.51.100.7"])).await.unwrap());
        let pushed = api.last_pushed();
        assert_eq!(pushed.filter_rules.len(), 2);
        assert_eq!(pushed.filter_rules[0], other);
        let managed = &pushed.filter_rules[1];
        assert_eq!(managed.filters, vec!["198.51.100.7"]);
        assert_eq!(managed.filter_type, "blacklist");
        assert!(managed.remark.starts_with("crowdsec "));
        assert_eq!(managed.rule_paths, vec!["*"]);
    }

    #[tokio::test]
    async fn second_apply_is_a_noop() {
        let api = Arc::new(MockCdnApi::with_rules(vec![]));
        let backend = CdnBackend::new(api.clone(), config());

        let list = bans(&["198.51.100.7", "198.51.100.9"]);
        assert!(backend.apply(&list).await.unwrap());
        assert_eq!(api.push_count(), 1);

        assert!(backend.apply(&list).await.unwrap());
        assert_eq!(api.push_count(), 1, "unchanged list must not be re-pushed");
    }

    #[tokio::test]
    async fn foreign_rule_entries_are_ignored_and_reduce_capacity() {
        let other = IpFilterRule {
            filter_type: "blacklist".to_string(),
            filters: vec!["198.51.100.7".to_string()],
            remark: "manual".to_string(),
            rule_type: "all".to_string(),
            rule_paths: vec!["*".to_string()],
        };
        let api = Arc::new(MockCdnApi::with_rules(vec![other]));
        let backend = CdnBackend::new(api.clone(), config());

        assert!(backend
            .apply(&bans(&["198.51.100.7", "203.0.113.9"]))
            .await
            .unwrap());
        let managed = api.last_pushed().filter_rules.last().cloned().unwrap();
        // already covered by the foreign blacklist rule
        assert_eq!(managed.filters, vec!["203.0.113.9"]);
    }

    #[tokio::test]
    async fn precheck_fails_when_domain_missing() {
        let api = Arc::new(MockCdnApi::missing());
        let backend = CdnBackend::new(api, config());
        assert!(matches!(
            backend.precheck().await,
            Err(BouncerError::Preflight(_))
        ));
    }

    #[tokio::test]
    async fn existing_managed_rule_is_replaced_not_duplicated() {
        let stale = IpFilterRule {
            filter_type: "blacklist".to_string(),
            filters: vec!["192.0.2.1".to_string()],
            remark: "crowdsec 2024-01-01T00:00:00Z".to_string(),
            rule_type: "all".to_string(),
            rule_paths: vec!["*".to_string()],
        };
        let api = Arc::new(MockCdnApi::with_rules(vec![stale]));
        let backend = CdnBackend::new(api.clone(), config());

        assert!(backend.apply(&bans(&["198.51.100.7"])).await.unwrap());
        let pushed = api.last_pushed();
        assert_eq!(pushed.filter_rules.len(), 1);
        assert_eq!(pushed.filter_rules[0].filters, vec!["198.51.100.7"]);
    }
}
