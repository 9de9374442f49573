use anyhow::Context;
use edge_bouncer_infrastructure::fastly::CleanupList;
use std::path::Path;

pub const DEFAULT_CLEANUP_FILE: &str = "./edge-bouncer-cleanup.csv";

/// Issue a DELETE for every `(token, url)` pair the bouncer recorded
/// while creating remote resources. Failures are reported and skipped so
/// one stale entry cannot block the rest of the rollback.
pub async fn run(path: &Path) -> anyhow::Result<()> {
    let pairs = CleanupList::read(path)
        .with_context(|| format!("cannot read cleanup file {}", path.display()))?;
    if pairs.is_empty() {
        println!("nothing to delete!");
        return Ok(());
    }

    let http = reqwest::Client::new();
    let mut failures = 0usize;
    for (token, url) in &pairs {
        let result = http
            .delete(url)
            .header("Fastly-Key", token.as_str())
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => {
                println!("deleted {url}");
            }
            Ok(response) => {
                eprintln!("delete {url} failed: HTTP {}", response.status());
                failures += 1;
            }
            Err(e) => {
                eprintln!("delete {url} failed: {e}");
                failures += 1;
            }
        }
    }
    if failures > 0 {
        anyhow::bail!("{failures} of {} deletions failed", pairs.len());
    }
    Ok(())
}
