use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Append-only ledger of `(token, delete-url)` pairs, one space-separated
/// pair per line. Every managed remote resource is recorded here when
/// created so a later `-d` run can roll everything back.
pub struct CleanupList {
    path: PathBuf,
}

impl CleanupList {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Best effort: a failed write is logged, never fatal to the tick.
    pub fn record(&self, token: &str, url: &str) {
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{token} {url}"));
        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "cannot record cleanup entry");
        }
    }

    /// Read back all recorded pairs, skipping malformed lines.
    pub fn read(path: &Path) -> std::io::Result<Vec<(String, String)>> {
        let file = std::fs::File::open(path)?;
        let mut pairs = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            let mut parts = line.splitn(2, ' ');
            if let (Some(token), Some(url)) = (parts.next(), parts.next()) {
                if !token.is_empty() && !url.is_empty() {
                    pairs.push((token.to_string(), url.to_string()));
                }
            }
        }
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_reads_back_pairs() {
        let dir = std::env::temp_dir().join("edge-bouncer-cleanup-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("cleanup.csv");
        let _ = std::fs::remove_file(&path);

        let list = CleanupList::new(&path);
        list.record("tok-a", "https://api.example.com/service/s1/version/2/acl/crowdsec_ban_0");
        list.record("tok-a", "https://api.example.com/service/s1/version/2/snippet/crowdsec_x");

        let pairs = CleanupList::read(&path).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0, "tok-a");
        assert!(pairs[1].1.ends_with("crowdsec_x"));
        let _ = std::fs::remove_file(&path);
    }
}
