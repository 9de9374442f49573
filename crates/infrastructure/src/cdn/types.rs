use serde::{Deserialize, Serialize};

/// One typed rule of a domain's IP filter. A rule carries either a
/// whitelist or a blacklist, never both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IpFilterRule {
    #[serde(default)]
    pub filter_type: String,

    #[serde(default)]
    pub filters: Vec<String>,

    #[serde(default)]
    pub remark: String,

    #[serde(default)]
    pub rule_type: String,

    #[serde(default)]
    pub rule_paths: Vec<String>,
}

/// The domain's full IP-filter block; pushed back wholesale on change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IpFilter {
    #[serde(default)]
    pub switch: String,

    #[serde(default)]
    pub filter_type: String,

    #[serde(default)]
    pub filter_rules: Vec<IpFilterRule>,
}

/// The slice of a domain's configuration the backend consumes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DomainConfig {
    #[serde(default)]
    pub domain: String,

    #[serde(default)]
    pub ip_filter: Option<IpFilter>,
}
