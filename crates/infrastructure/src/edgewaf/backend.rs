use async_trait::async_trait;
use chrono::Utc;
use edge_bouncer_application::ports::Backend;
use edge_bouncer_domain::config::WafConfig;
use edge_bouncer_domain::{BanList, BouncerError, IpGroupPartitioner, IpListBuilder};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::condition::{parse_ip_condition, render_ip_condition};
use super::types::{CustomRule, CustomRules, SecurityAction, SecurityPolicy};
use crate::tencent::TencentClient;

const API_SERVICE: &str = "teo";
const API_VERSION: &str = "2022-09-01";

/// Minimum overlap ratio for a new bin to inherit an old rule's id.
const CARRYOVER_MIN_JACCARD: f64 = 0.1;

#[async_trait]
pub trait EdgeWafApi: Send + Sync {
    async fn describe_security_policy(
        &self,
        zone_id: &str,
    ) -> Result<Option<SecurityPolicy>, BouncerError>;

    async fn modify_security_policy(
        &self,
        zone_id: &str,
        policy: &SecurityPolicy,
    ) -> Result<String, BouncerError>;
}

pub struct HttpEdgeWafApi {
    client: TencentClient,
}

impl HttpEdgeWafApi {
    pub fn new(secret_id: String, secret_key: String) -> Self {
        Self {
            client: TencentClient::new(secret_id, secret_key),
        }
    }
}

#[async_trait]
impl EdgeWafApi for HttpEdgeWafApi {
    async fn describe_security_policy(
        &self,
        zone_id: &str,
    ) -> Result<Option<SecurityPolicy>, BouncerError> {
        let payload = json!({
            "ZoneId": zone_id,
            "Entity": "ZoneDefaultPolicy",
        });
        let response = self
            .client
            .post_action(API_SERVICE, API_VERSION, "DescribeSecurityPolicy", &payload)
            .await?;
        let Some(policy) = response.get("SecurityPolicy") else {
            return Ok(None);
        };
        if policy.is_null() {
            return Ok(None);
        }
        let policy: SecurityPolicy = serde_json::from_value(policy.clone())
            .map_err(|e| BouncerError::RemoteValidation(format!("bad security policy: {e}")))?;
        Ok(Some(policy))
    }

    async fn modify_security_policy(
        &self,
        zone_id: &str,
        policy: &SecurityPolicy,
    ) -> Result<String, BouncerError> {
        let payload = json!({
            "ZoneId": zone_id,
            "Entity": "ZoneDefaultPolicy",
            "SecurityPolicy": policy,
        });
        let response = self
            .client
            .post_action(API_SERVICE, API_VERSION, "ModifySecurityPolicy", &payload)
            .await?;
        Ok(response
            .get("RequestId")
            .and_then(|id| id.as_str())
            .unwrap_or_default()
            .to_string())
    }
}

/// Projects the ban set onto up to `max_rules` managed custom rules of a
/// zone, `ips_per_rule` entries each.
///
/// The remote surface versions rules on every mutation, so identity is
/// preserved wherever possible: the partitioner never moves a surviving
/// IP between bins, and bins inherit the ids of the old rules they
/// overlap most with.
pub struct EdgeWafBackend {
    api: Arc<dyn EdgeWafApi>,
    config: WafConfig,
}

impl EdgeWafBackend {
    pub fn new(api: Arc<dyn EdgeWafApi>, config: WafConfig) -> Self {
        Self { api, config }
    }

    fn is_managed(&self, rule: &CustomRule) -> bool {
        rule.name
            .to_lowercase()
            .starts_with(&self.config.rule_prefix.to_lowercase())
    }

    fn split_rules(&self, policy: &SecurityPolicy) -> (Vec<CustomRule>, Vec<CustomRule>) {
        let mut managed = Vec::new();
        let mut others = Vec::new();
        for rule in &policy.custom_rules.rules {
            if self.is_managed(rule) {
                managed.push(rule.clone());
            } else {
                others.push(rule.clone());
            }
        }
        managed.sort_by(|a, b| a.name.cmp(&b.name));
        (managed, others)
    }

    /// Carry old rule ids onto the new bins: exact content match first,
    /// then the unused old rule with the largest entry overlap, kept only
    /// above a small Jaccard cutoff.
    fn carry_rule_ids(old: &[(String, Vec<String>)], bins: &[Vec<String>]) -> Vec<Option<String>> {
        let mut taken = vec![false; old.len()];
        let mut assigned: Vec<Option<String>> = vec![None; bins.len()];

        for (bin_idx, bin) in bins.iter().enumerate() {
            if let Some(old_idx) = (0..old.len()).find(|&idx| !taken[idx] && &old[idx].1 == bin) {
                taken[old_idx] = true;
                assigned[bin_idx] = Some(old[old_idx].0.clone());
            }
        }

        for (bin_idx, bin) in bins.iter().enumerate() {
            if assigned[bin_idx].is_some() {
                continue;
            }
            let bin_set: HashSet<&str> = bin.iter().map(String::as_str).collect();
            let mut best: Option<(usize, f64)> = None;
            for (old_idx, (_, entries)) in old.iter().enumerate() {
                if taken[old_idx] {
                    continue;
                }
                let old_set: HashSet<&str> = entries.iter().map(String::as_str).collect();
                let intersection = bin_set.intersection(&old_set).count();
                let union = bin_set.union(&old_set).count();
                if union == 0 {
                    continue;
                }
                let jaccard = intersection as f64 / union as f64;
                if jaccard >= CARRYOVER_MIN_JACCARD
                    && best.map_or(true, |(_, score)| jaccard > score)
                {
                    best = Some((old_idx, jaccard));
                }
            }
            if let Some((old_idx, score)) = best {
                debug!(bin = bin_idx, jaccard = score, "carrying rule id by overlap");
                taken[old_idx] = true;
                assigned[bin_idx] = Some(old[old_idx].0.clone());
            }
        }

        assigned
    }
}

#[async_trait]
impl Backend for EdgeWafBackend {
    fn name(&self) -> &str {
        "waf"
    }

    async fn precheck(&self) -> Result<(), BouncerError> {
        match self
            .api
            .describe_security_policy(&self.config.zone_id)
            .await?
        {
            Some(_) => Ok(()),
            None => Err(BouncerError::Preflight(format!(
                "waf zone {} not found",
                self.config.zone_id
            ))),
        }
    }

    async fn apply(&self, ban_list: &BanList) -> Result<bool, BouncerError> {
        let zone_id = &self.config.zone_id;
        let Some(policy) = self.api.describe_security_policy(zone_id).await? else {
            warn!(zone_id = %zone_id, "waf zone not found, skipping tick");
            return Ok(false);
        };

        let (managed, others) = self.split_rules(&policy);

        let capacity = self.config.max_rules * self.config.ips_per_rule;
        let mut builder = IpListBuilder::new(capacity);
        builder.add_many(ban_list.iter().map(|entry| entry.value.as_str()));
        let (blocklist, discards) = builder.finalize();

        // Seed the partitioner with the grouping observed on the remote so
        // surviving IPs stay in their rule.
        let old: Vec<(String, Vec<String>)> = managed
            .iter()
            .map(|rule| {
                let mut entries = if rule.rule_type == "BasicAccessRule" {
                    parse_ip_condition(&rule.condition)
                } else {
                    Vec::new()
                };
                entries.sort();
                (rule.id.clone(), entries)
            })
            .collect();

        let mut partitioner = IpGroupPartitioner::new(self.config.ips_per_rule);
        partitioner.load(old.iter().map(|(_, entries)| entries.clone()).collect());
        let stats = partitioner.update(&blocklist);
        let bins = partitioner.bins();

        let old_contents: Vec<&Vec<String>> = old.iter().map(|(_, entries)| entries).collect();
        if bins.len() == old.len() && bins.iter().all(|bin| old_contents.contains(&bin)) {
            info!(zone_id = %zone_id, "ip groups unchanged, nothing to apply");
            return Ok(true);
        }

        info!(
            zone_id = %zone_id,
            added = stats.added,
            removed = stats.removed,
            rules = stats.bin_count,
            total_ips = stats.total_ips,
            discarded = discards.len(),
            "applying decision set to waf custom rules"
        );

        let carried = Self::carry_rule_ids(&old, &bins);
        let stamp = Utc::now().format("%Y%m%d-%H%M%S");
        let mut rules = others;
        for (idx, bin) in bins.iter().enumerate() {
            let carried_rule = carried[idx]
                .as_ref()
                .and_then(|id| managed.iter().find(|rule| &rule.id == id));
            rules.push(CustomRule {
                id: carried[idx].clone().unwrap_or_default(),
                name: format!("{}-{idx}-{stamp}", self.config.rule_prefix),
                condition: render_ip_condition(bin),
                action: SecurityAction::deny(),
                enabled: carried_rule
                    .map(|rule| rule.enabled.clone())
                    .filter(|enabled| !enabled.is_empty())
                    .unwrap_or_else(|| "on".to_string()),
                rule_type: "BasicAccessRule".to_string(),
                priority: 0,
            });
        }

        let request_id = self
            .api
            .modify_security_policy(
                zone_id,
                &SecurityPolicy {
                    custom_rules: CustomRules { rules },
                },
            )
            .await?;
        info!(zone_id = %zone_id, request_id = %request_id, "waf custom rules updated");
        Ok(true)
    }
}
