//! # Edge Bouncer
//!
//! Main entry point: subscribes to a threat-decision feed and projects
//! the current ban set onto the configured edge access-control surfaces.

use clap::Parser;
use edge_bouncer_domain::CliOverrides;
use edge_bouncer_jobs::{DecisionSyncJob, JobRunner};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

mod bootstrap;
mod commands;
mod di;

/// Seconds the dry run waits for the first stream poll to hydrate.
const DRYRUN_HYDRATION_SECS: u64 = 3;

#[derive(Parser)]
#[command(name = "edge-bouncer")]
#[command(version)]
#[command(about = "Synchronizes threat decisions onto edge access-control surfaces")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Run preflight checks and one hydration tick, then exit
    #[arg(long)]
    dryrun: bool,

    /// Delete every remote resource recorded in the cleanup file
    #[arg(short = 'd', long = "cleanup")]
    cleanup: bool,

    /// Comma-separated account tokens to generate a config skeleton for
    #[arg(short = 'g', long = "generate", value_name = "TOKEN,...")]
    generate: Option<String>,

    /// Write the generated config here instead of stdout
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long = "log-level")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(config_path) = cli.config.clone() else {
        // the cleanup and generation shortcuts work without a config
        if cli.cleanup {
            return commands::cleanup::run(Path::new(commands::cleanup::DEFAULT_CLEANUP_FILE))
                .await;
        }
        if let Some(tokens) = &cli.generate {
            return commands::generate::run(tokens, cli.output.as_deref(), None).await;
        }
        anyhow::bail!("a configuration file is required (-c CONFIG)");
    };

    let config = bootstrap::load_config(
        &config_path,
        CliOverrides {
            log_level: cli.log_level.clone(),
            update_frequency: None,
        },
    )?;
    bootstrap::init_logging(&config);

    if cli.cleanup {
        let path = config
            .fastly
            .as_ref()
            .map(|fastly| fastly.cleanup_file.clone())
            .unwrap_or_else(|| commands::cleanup::DEFAULT_CLEANUP_FILE.to_string());
        return commands::cleanup::run(Path::new(&path)).await;
    }
    if let Some(tokens) = &cli.generate {
        return commands::generate::run(tokens, cli.output.as_deref(), Some(config)).await;
    }

    let flag = if cli.dryrun { "[DRYRUN] " } else { "" };
    info!("{flag}starting edge bouncer");

    let shutdown = CancellationToken::new();
    let sync = di::build_sync(&config, shutdown.clone());
    sync.preflight()
        .await
        .map_err(|e| anyhow::anyhow!("preflight failed: {e}"))?;
    info!("{flag}preflight checks passed");

    if cli.dryrun {
        sync.start_feed().await;
        tokio::time::sleep(Duration::from_secs(DRYRUN_HYDRATION_SECS)).await;
        shutdown.cancel();
        info!("[DRYRUN] hydration completed, exiting without applying");
        return Ok(());
    }

    let job = DecisionSyncJob::new(sync)
        .with_interval(config.update_frequency)
        .with_cancellation(shutdown.clone());
    let handles = JobRunner::new().with_decision_sync(job).start().await;
    info!("edge bouncer running, press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    shutdown.cancel();
    for handle in handles {
        let _ = handle.await;
    }
    Ok(())
}
