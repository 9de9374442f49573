use serde::{Deserialize, Serialize};
use std::path::Path;

use super::cdn::CdnConfig;
use super::errors::ConfigError;
use super::fastly::FastlyConfig;
use super::feed::DecisionFeedConfig;
use super::waf::WafConfig;

/// Main configuration, loaded from a TOML file.
///
/// Backends are constructed only for the sections that are present.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds between synchronization ticks
    #[serde(default = "default_update_frequency")]
    pub update_frequency: u64,

    /// Seconds a failing backend sleeps before the loop moves on
    #[serde(default = "default_recovery_delay")]
    pub recovery_delay: u64,

    pub decision_feed: DecisionFeedConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdn: Option<CdnConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waf: Option<WafConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fastly: Option<FastlyConfig>,
}

/// Values the CLI may override after the file is parsed.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub log_level: Option<String>,
    pub update_frequency: Option<u64>,
}

impl Config {
    pub fn load(path: &Path, overrides: CliOverrides) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut config: Config =
            toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;

        if let Some(level) = overrides.log_level {
            config.log_level = level;
        }
        if let Some(freq) = overrides.update_frequency {
            config.update_frequency = freq;
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.update_frequency == 0 {
            return Err(ConfigError::Invalid {
                field: "update_frequency".to_string(),
                reason: "must be at least 1 second".to_string(),
            });
        }
        if self.decision_feed.api_key.is_empty() {
            return Err(ConfigError::Missing("decision_feed.api_key".to_string()));
        }
        if self.cdn.is_none() && self.waf.is_none() && self.fastly.is_none() {
            return Err(ConfigError::Missing(
                "at least one of [cdn], [waf], [fastly]".to_string(),
            ));
        }
        if let Some(cdn) = &self.cdn {
            if cdn.domain.is_empty() {
                return Err(ConfigError::Missing("cdn.domain".to_string()));
            }
            if cdn.max_entries == 0 {
                return Err(ConfigError::Invalid {
                    field: "cdn.max_entries".to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        }
        if let Some(waf) = &self.waf {
            if waf.zone_id.is_empty() {
                return Err(ConfigError::Missing("waf.zone_id".to_string()));
            }
            if waf.max_rules == 0 || waf.ips_per_rule == 0 {
                return Err(ConfigError::Invalid {
                    field: "waf.max_rules".to_string(),
                    reason: "rule fleet and per-rule capacity must be positive".to_string(),
                });
            }
        }
        if let Some(fastly) = &self.fastly {
            for (i, account) in fastly.accounts.iter().enumerate() {
                if account.account_token.is_empty() {
                    return Err(ConfigError::Missing(format!(
                        "fastly.accounts[{i}].account_token"
                    )));
                }
                if account.services.is_empty() {
                    return Err(ConfigError::Missing(format!(
                        "fastly.accounts[{i}].services"
                    )));
                }
            }
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_update_frequency() -> u64 {
    10
}

fn default_recovery_delay() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Config {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn minimal_cdn_config_parses_with_defaults() {
        let config = parse(
            r#"
            [decision_feed]
            api_key = "key"

            [cdn]
            secret_id = "id"
            secret_key = "secret"
            domain = "cdn.example.com"
            "#,
        );
        assert_eq!(config.log_level, "info");
        assert_eq!(config.update_frequency, 10);
        assert_eq!(config.decision_feed.api_url, "http://localhost:8080/");
        let cdn = config.cdn.as_ref().unwrap();
        assert_eq!(cdn.rule_prefix, "crowdsec");
        assert_eq!(cdn.max_entries, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_requires_a_backend() {
        let config = parse(
            r#"
            [decision_feed]
            api_key = "key"
            "#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_frequency() {
        let config = parse(
            r#"
            update_frequency = 0

            [decision_feed]
            api_key = "key"

            [waf]
            secret_id = "id"
            secret_key = "secret"
            zone_id = "zone-1"
            "#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn fastly_accounts_must_have_services() {
        let config = parse(
            r#"
            [decision_feed]
            api_key = "key"

            [fastly]
            [[fastly.accounts]]
            account_token = "tok"
            services = []
            "#,
        );
        assert!(config.validate().is_err());
    }
}
