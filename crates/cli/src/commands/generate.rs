use anyhow::Context;
use edge_bouncer_domain::config::{
    DecisionFeedConfig, FastlyAccountConfig, FastlyConfig, FastlyServiceConfig,
};
use edge_bouncer_domain::Config;
use edge_bouncer_infrastructure::fastly::{FastlyApi, FastlyHttpClient};
use std::path::Path;

use super::cleanup::DEFAULT_CLEANUP_FILE;

/// Build a config skeleton for the given comma-separated account tokens:
/// every service visible to each token gets an entry with placeholder
/// reCAPTCHA keys to fill in.
pub async fn run(
    tokens: &str,
    output: Option<&Path>,
    base: Option<Config>,
) -> anyhow::Result<()> {
    let mut accounts = Vec::new();
    for token in tokens.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let api = FastlyHttpClient::new(token.to_string(), None);
        let service_ids = api
            .list_service_ids()
            .await
            .with_context(|| "cannot list services for account token")?;
        accounts.push(FastlyAccountConfig {
            account_token: token.to_string(),
            services: service_ids
                .into_iter()
                .map(|service_id| FastlyServiceConfig {
                    service_id,
                    max_items: 5000,
                    recaptcha_site_key: "<RECAPTCHA_SITE_KEY>".to_string(),
                    recaptcha_secret_key: "<RECAPTCHA_SECRET_KEY>".to_string(),
                })
                .collect(),
        });
    }

    let mut config = base.unwrap_or_else(skeleton_config);
    config.fastly = Some(FastlyConfig {
        accounts,
        cleanup_file: DEFAULT_CLEANUP_FILE.to_string(),
    });

    let rendered = toml::to_string_pretty(&config).context("cannot render config")?;
    match output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("cannot write {}", path.display()))?;
            println!("wrote config to {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn skeleton_config() -> Config {
    Config {
        log_level: "info".to_string(),
        update_frequency: 10,
        recovery_delay: 30,
        decision_feed: DecisionFeedConfig {
            api_url: "http://localhost:8080/".to_string(),
            api_key: "<LAPI_KEY>".to_string(),
            origins: vec!["crowdsec".to_string()],
        },
        cdn: None,
        waf: None,
        fastly: None,
    }
}
