use serde::{Deserialize, Serialize};

/// Decision feed (Local API) connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DecisionFeedConfig {
    /// Base URL of the Local API (default: "http://localhost:8080/")
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bouncer API key
    pub api_key: String,

    /// Only keep decisions from these origins (empty = keep all)
    #[serde(default = "default_origins")]
    pub origins: Vec<String>,
}

fn default_api_url() -> String {
    "http://localhost:8080/".to_string()
}

fn default_origins() -> Vec<String> {
    vec!["crowdsec".to_string()]
}
