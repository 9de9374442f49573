use serde::{Deserialize, Serialize};

/// CDN IP-filter backend settings
///
/// The managed blacklist rule is identified by `rule_prefix` in its remark.
/// `max_entries` is the provider-side cap on blacklist entries across all
/// rules of the domain.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CdnConfig {
    pub secret_id: String,
    pub secret_key: String,

    /// Accelerated domain whose IP filter is managed
    pub domain: String,

    #[serde(default = "default_rule_prefix")]
    pub rule_prefix: String,

    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

pub(crate) fn default_rule_prefix() -> String {
    "crowdsec".to_string()
}

fn default_max_entries() -> usize {
    200
}
