use edge_bouncer_domain::{CliOverrides, Config};
use std::path::Path;
use tracing::info;

pub fn load_config(config_path: &Path, cli_overrides: CliOverrides) -> anyhow::Result<Config> {
    let config = Config::load(config_path, cli_overrides)?;
    config.validate()?;

    info!(
        config_file = %config_path.display(),
        update_frequency = config.update_frequency,
        cdn = config.cdn.is_some(),
        waf = config.waf.is_some(),
        fastly = config.fastly.is_some(),
        "Configuration loaded"
    );

    Ok(config)
}
