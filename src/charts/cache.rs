//! Time-bucketed file cache for rendered charts.
//!
//! An entry is keyed by chart type and `floor(unix_time / window)`. Staleness
//! is implicit: once the bucket advances, `lookup` computes a new key and
//! misses. `store` removes the other buckets of the same chart type so that
//! at most one file per chart type remains.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use super::ChartType;

/// Distinguishes concurrent writers within one process.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Result of a successful `store`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreReport {
    /// Bucket the entry was written under.
    pub bucket: u64,
    /// Stale sibling entries removed.
    pub removed: usize,
    /// Stale sibling entries that could not be removed.
    pub cleanup_failures: usize,
}

/// File-per-bucket chart cache rooted at an explicit directory.
#[derive(Debug, Clone)]
pub struct ChartCache {
    root: PathBuf,
}

impl ChartCache {
    /// Open the cache, creating the root directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the entry for the current bucket, if one exists.
    pub async fn lookup(&self, chart: ChartType, window_secs: u64) -> Option<Vec<u8>> {
        self.lookup_at(chart, window_secs, SystemTime::now()).await
    }

    /// Store `bytes` under the current bucket, replacing older buckets.
    pub async fn store(
        &self,
        chart: ChartType,
        window_secs: u64,
        bytes: &[u8],
    ) -> io::Result<StoreReport> {
        self.store_at(chart, window_secs, bytes, SystemTime::now())
            .await
    }

    pub(crate) async fn lookup_at(
        &self,
        chart: ChartType,
        window_secs: u64,
        now: SystemTime,
    ) -> Option<Vec<u8>> {
        let bucket = bucket_at(now, window_secs);
        let path = self.entry_path(chart, bucket);

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                tracing::debug!(chart = chart.as_str(), bucket, "chart cache hit");
                Some(bytes)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(chart = chart.as_str(), bucket, "chart cache miss");
                None
            }
            Err(e) => {
                tracing::warn!("Failed to read cached chart {:?}: {}", path, e);
                None
            }
        }
    }

    pub(crate) async fn store_at(
        &self,
        chart: ChartType,
        window_secs: u64,
        bytes: &[u8],
        now: SystemTime,
    ) -> io::Result<StoreReport> {
        let bucket = bucket_at(now, window_secs);
        let (removed, cleanup_failures) = self.remove_siblings(chart, bucket).await;

        self.write_entry(chart, bucket, bytes).await?;

        Ok(StoreReport {
            bucket,
            removed,
            cleanup_failures,
        })
    }

    /// Remove every entry of `chart` whose bucket differs from `keep`.
    async fn remove_siblings(&self, chart: ChartType, keep: u64) -> (usize, usize) {
        let mut removed = 0;
        let mut failures = 0;

        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Failed to list chart cache {:?}: {}", self.root, e);
                return (0, 1);
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Failed to scan chart cache {:?}: {}", self.root, e);
                    failures += 1;
                    break;
                }
            };

            let name = entry.file_name();
            let Some(bucket) = name.to_str().and_then(|n| parse_entry_name(chart, n)) else {
                continue;
            };
            if bucket == keep {
                continue;
            }

            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                // Another request already cleaned it up.
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!("Failed to remove stale chart {:?}: {}", entry.path(), e);
                    failures += 1;
                }
            }
        }

        (removed, failures)
    }

    /// Write the entry through a temporary sibling and rename it into place,
    /// so a concurrent `lookup` sees either the old file, no file or the
    /// complete new one.
    async fn write_entry(&self, chart: ChartType, bucket: u64, bytes: &[u8]) -> io::Result<()> {
        let target = self.entry_path(chart, bucket);
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        let temp = self.root.join(format!(
            "{}.tmp.{}-{}",
            entry_name(chart, bucket),
            std::process::id(),
            seq
        ));

        let written = match tokio::fs::write(&temp, bytes).await {
            Ok(()) => tokio::fs::rename(&temp, &target).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&temp).await {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove partial chart {:?}: {}", temp, cleanup);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    fn entry_path(&self, chart: ChartType, bucket: u64) -> PathBuf {
        self.root.join(entry_name(chart, bucket))
    }
}

/// Bucket index for `now`. A zero window is treated as one second.
pub fn bucket_at(now: SystemTime, window_secs: u64) -> u64 {
    let secs = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    secs / window_secs.max(1)
}

/// Seconds until the bucket containing `now` ends.
pub fn seconds_left_in_bucket(now: SystemTime, window_secs: u64) -> u64 {
    let window = window_secs.max(1);
    let secs = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    window - secs % window
}

fn entry_name(chart: ChartType, bucket: u64) -> String {
    format!("chart_{}_{}.png", chart.as_str(), bucket)
}

fn parse_entry_name(chart: ChartType, name: &str) -> Option<u64> {
    let rest = name.strip_prefix("chart_")?.strip_prefix(chart.as_str())?;
    let digits = rest.strip_prefix('_')?.strip_suffix(".png")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
