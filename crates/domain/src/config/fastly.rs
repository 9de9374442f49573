use serde::{Deserialize, Serialize};

/// Fastly-style backend settings: a list of account tokens, each managing
/// a list of services.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FastlyConfig {
    #[serde(default)]
    pub accounts: Vec<FastlyAccountConfig>,

    /// File recording `(token, delete-url)` pairs for later rollback
    #[serde(default = "default_cleanup_file")]
    pub cleanup_file: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FastlyAccountConfig {
    pub account_token: String,
    pub services: Vec<FastlyServiceConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FastlyServiceConfig {
    pub service_id: String,

    /// Upper bound on tracked items per action for this service
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    pub recaptcha_site_key: String,
    pub recaptcha_secret_key: String,
}

fn default_cleanup_file() -> String {
    "./edge-bouncer-cleanup.csv".to_string()
}

fn default_max_items() -> usize {
    5000
}
