use serde::{Deserialize, Serialize};

/// Zone default security policy; only the custom-rule list is consumed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityPolicy {
    #[serde(default)]
    pub custom_rules: CustomRules,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomRules {
    #[serde(default)]
    pub rules: Vec<CustomRule>,
}

/// One custom security rule. Managed rules are `BasicAccessRule`s whose
/// name starts with the bouncer prefix and whose condition is an IP-set
/// membership test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomRule {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub condition: String,

    #[serde(default)]
    pub action: SecurityAction,

    #[serde(default)]
    pub enabled: String,

    #[serde(default)]
    pub rule_type: String,

    #[serde(default)]
    pub priority: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityAction {
    #[serde(default)]
    pub name: String,
}

impl SecurityAction {
    pub fn deny() -> Self {
        Self {
            name: "Deny".to_string(),
        }
    }
}
