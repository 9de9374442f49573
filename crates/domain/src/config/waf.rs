use serde::{Deserialize, Serialize};

use super::cdn::default_rule_prefix;

/// Edge-WAF custom-rule backend settings
///
/// Total blocklist capacity is `max_rules * ips_per_rule`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WafConfig {
    pub secret_id: String,
    pub secret_key: String,

    /// Zone whose default security policy is managed
    pub zone_id: String,

    #[serde(default = "default_max_rules")]
    pub max_rules: usize,

    /// Provider-side cap on IPs embedded in one rule condition
    #[serde(default = "default_ips_per_rule")]
    pub ips_per_rule: usize,

    #[serde(default = "default_rule_prefix")]
    pub rule_prefix: String,
}

fn default_max_rules() -> usize {
    10
}

fn default_ips_per_rule() -> usize {
    2000
}
