//! Year-partitioned Parquet store with idempotent merge-on-write.
//!
//! Every write is a full read-merge-rewrite of one year partition: existing
//! rows and incoming rows are deduplicated on the identity key (incoming wins,
//! and later incoming rows win over earlier ones), sorted by timestamp, and
//! atomically swapped in. Year partitioning bounds the rewrite cost to one
//! year of data per write at the price of multi-partition reads across year
//! boundaries.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::parquet::{
    dt_to_ns, ns_to_dt, read_batches, timestamp_column_stats, write_batch_atomic,
    DEFAULT_ZSTD_LEVEL,
};
use crate::paths;
use crate::record::PartitionRecord;

pub struct PartitionStore {
    root: PathBuf,
    zstd_level: i32,
}

impl PartitionStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(paths::raw_root(&root))?;
        Ok(Self {
            root,
            zstd_level: DEFAULT_ZSTD_LEVEL,
        })
    }

    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.zstd_level = level;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Merge `rows` into the (market, data_type, year) partition and return
    /// its path. Rows must all fall in `year`; callers split multi-year
    /// batches beforehand.
    pub fn write<R: PartitionRecord>(
        &self,
        rows: &[R],
        market: &str,
        year: i32,
    ) -> Result<PathBuf, StoreError> {
        let path = paths::partition_path(&self.root, market, R::DATA_TYPE, year);

        let existing: Vec<R> = if partition_present(&path) {
            read_partition(&path)?
        } else {
            Vec::new()
        };
        let existed = !existing.is_empty();

        // Last write wins per identity key: existing rows first, then
        // incoming in original order, each insert displacing earlier ones.
        let mut merged: HashMap<R::Key, R> =
            HashMap::with_capacity(existing.len() + rows.len());
        for row in existing.into_iter().chain(rows.iter().cloned()) {
            merged.insert(row.identity_key(), row);
        }
        let mut out: Vec<R> = merged.into_values().collect();
        out.sort_by_cached_key(|r| (r.timestamp_ns(), r.identity_key()));

        let batch = R::to_batch(&out)?;
        write_batch_atomic(&path, &batch, self.zstd_level)?;

        info!(
            market,
            data_type = %R::DATA_TYPE,
            year,
            incoming = rows.len(),
            total = out.len(),
            merged = existed,
            "wrote partition"
        );
        Ok(path)
    }

    /// Rows with `start <= timestamp < end`, across however many year
    /// partitions the range touches, sorted ascending. Missing partitions
    /// contribute nothing; no data is an empty vec, never an error.
    pub fn read<R: PartitionRecord>(
        &self,
        market: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<R>, StoreError> {
        let start_ns = dt_to_ns(start);
        let end_ns = dt_to_ns(end);

        let mut rows: Vec<R> = Vec::new();
        for year in start.year()..=end.year() {
            let path = paths::partition_path(&self.root, market, R::DATA_TYPE, year);
            if !partition_present(&path) {
                continue;
            }
            debug!(path = %path.display(), "reading partition");
            rows.extend(read_partition::<R>(&path)?);
        }

        rows.retain(|r| {
            let ts = r.timestamp_ns();
            start_ns <= ts && ts < end_ns
        });
        rows.sort_by_cached_key(|r| (r.timestamp_ns(), r.identity_key()));
        Ok(rows)
    }

    /// Global min/max timestamp over every partition of the (market,
    /// data_type) pair, or `None` when nothing has been stored.
    pub fn date_range<R: PartitionRecord>(
        &self,
        market: &str,
    ) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, StoreError> {
        let dir = paths::dataset_dir(&self.root, market, R::DATA_TYPE);
        if !dir.is_dir() {
            return Ok(None);
        }

        let mut bounds: Option<(i64, i64)> = None;
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(paths::PARTITION_EXT) {
                continue;
            }
            let (_, stats) = timestamp_column_stats(&path, "timestamp_utc")?;
            if let Some((min_ns, max_ns)) = stats {
                bounds = Some(match bounds {
                    Some((lo, hi)) => (lo.min(min_ns), hi.max(max_ns)),
                    None => (min_ns, max_ns),
                });
            }
        }

        Ok(bounds.map(|(lo, hi)| (ns_to_dt(lo), ns_to_dt(hi))))
    }

    /// Markets that have ever been written, lowercased, sorted.
    pub fn list_markets(&self) -> Result<Vec<String>, StoreError> {
        list_dirs(&paths::raw_root(&self.root))
    }

    /// Data types stored for a market, sorted.
    pub fn list_data_types(&self, market: &str) -> Result<Vec<String>, StoreError> {
        list_dirs(&paths::market_dir(&self.root, market))
    }
}

/// A zero-byte partition (e.g. an interrupted first write on a filesystem
/// without atomic rename) reads as absent rather than corrupt.
fn partition_present(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) => meta.len() > 0,
        Err(_) => false,
    }
}

fn read_partition<R: PartitionRecord>(path: &Path) -> Result<Vec<R>, StoreError> {
    let mut rows = Vec::new();
    for batch in read_batches(path)? {
        rows.extend(R::from_batch(&batch)?);
    }
    Ok(rows)
}

fn list_dirs(dir: &Path) -> Result<Vec<String>, StoreError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}
