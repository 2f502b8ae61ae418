//! Append-only collection ledger.
//!
//! One entry per collection attempt, stamped at log time and never mutated.
//! The whole file is rewritten on each append; the ledger is tiny next to
//! the raw store, and the single-writer assumption holds for the whole crate.
//! Error-status entries are kept for audit but excluded from every coverage
//! computation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{StringBuilder, TimestampNanosecondBuilder, UInt64Builder};
use arrow::datatypes::{DataType as ArrowType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use elec_types::{CollectionStatus, CollectionSummary, DataType, LedgerEntry};
use tracing::info;

use crate::error::StoreError;
use crate::parquet::{
    dt_to_ns, ns_to_dt, read_batches, string_col, timestamp_col, u64_col, write_batch_atomic,
    DEFAULT_ZSTD_LEVEL, UTC_TZ,
};
use crate::paths;

pub struct CollectionLedger {
    path: PathBuf,
    zstd_level: i32,
}

impl CollectionLedger {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = paths::ledger_path(&root.into());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            zstd_level: DEFAULT_ZSTD_LEVEL,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one collection event; `collected_at` is stamped now.
    #[allow(clippy::too_many_arguments)]
    pub fn log(
        &self,
        market: &str,
        data_type: DataType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        rows: u64,
        source: &str,
        status: CollectionStatus,
    ) -> Result<(), StoreError> {
        let mut entries = self.entries()?;
        entries.push(LedgerEntry {
            market: market.to_string(),
            data_type,
            start_date: start,
            end_date: end,
            rows_collected: rows,
            collected_at: Utc::now(),
            source: source.to_string(),
            status,
        });
        let batch = entries_to_batch(&entries)?;
        write_batch_atomic(&self.path, &batch, self.zstd_level)?;

        info!(
            market,
            data_type = %data_type,
            %status,
            start = %start,
            end = %end,
            rows,
            "logged collection"
        );
        Ok(())
    }

    /// Every entry in log order. A missing ledger file is an empty ledger.
    pub fn entries(&self) -> Result<Vec<LedgerEntry>, StoreError> {
        match fs::metadata(&self.path) {
            Ok(meta) if meta.len() > 0 => {}
            _ => return Ok(Vec::new()),
        }
        let mut entries = Vec::new();
        for batch in read_batches(&self.path)? {
            entries.extend(batch_to_entries(&batch)?);
        }
        Ok(entries)
    }

    /// Latest `end_date` among successful collections for the pair.
    pub fn get_latest(
        &self,
        market: &str,
        data_type: DataType,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self
            .successes(market, data_type)?
            .into_iter()
            .map(|e| e.end_date)
            .max())
    }

    /// Sub-ranges of `[expected_start, expected_end)` with no successful
    /// collection, in chronological order. Covered intervals that overlap or
    /// touch are merged first, so a seam covered by two collections is never
    /// reported as a gap.
    pub fn get_gaps(
        &self,
        market: &str,
        data_type: DataType,
        expected_start: DateTime<Utc>,
        expected_end: DateTime<Utc>,
    ) -> Result<Vec<(DateTime<Utc>, DateTime<Utc>)>, StoreError> {
        let successes = self.successes(market, data_type)?;
        if successes.is_empty() {
            return Ok(vec![(expected_start, expected_end)]);
        }

        let mut ranges: Vec<(DateTime<Utc>, DateTime<Utc>)> = successes
            .iter()
            .map(|e| (e.start_date, e.end_date))
            .collect();
        ranges.sort();

        // Fold overlapping or touching ranges (start <= previous end merges).
        let mut merged: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::with_capacity(ranges.len());
        for (start, end) in ranges {
            match merged.last_mut() {
                Some(last) if start <= last.1 => last.1 = last.1.max(end),
                _ => merged.push((start, end)),
            }
        }

        let mut gaps = Vec::new();
        let mut cursor = expected_start;
        for (covered_start, covered_end) in merged {
            if cursor < covered_start {
                gaps.push((cursor, covered_start));
            }
            cursor = cursor.max(covered_end);
        }
        if cursor < expected_end {
            gaps.push((cursor, expected_end));
        }
        Ok(gaps)
    }

    /// Successful collections grouped by (market, data_type): earliest start,
    /// latest end, total rows, most recent collection time. Empty when the
    /// ledger holds no successes.
    pub fn status(&self) -> Result<Vec<CollectionSummary>, StoreError> {
        let mut groups: BTreeMap<(String, DataType), CollectionSummary> = BTreeMap::new();
        for entry in self.entries()? {
            if entry.status != CollectionStatus::Success {
                continue;
            }
            let key = (entry.market.clone(), entry.data_type);
            groups
                .entry(key)
                .and_modify(|s| {
                    s.earliest = s.earliest.min(entry.start_date);
                    s.latest = s.latest.max(entry.end_date);
                    s.total_rows += entry.rows_collected;
                    s.last_collected = s.last_collected.max(entry.collected_at);
                })
                .or_insert_with(|| CollectionSummary {
                    market: entry.market.clone(),
                    data_type: entry.data_type,
                    earliest: entry.start_date,
                    latest: entry.end_date,
                    total_rows: entry.rows_collected,
                    last_collected: entry.collected_at,
                });
        }
        Ok(groups.into_values().collect())
    }

    fn successes(&self, market: &str, data_type: DataType) -> Result<Vec<LedgerEntry>, StoreError> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| {
                e.market == market
                    && e.data_type == data_type
                    && e.status == CollectionStatus::Success
            })
            .collect())
    }
}

// ---------- Ledger file codec ----------

fn ledger_schema() -> SchemaRef {
    let ts = |name: &str| {
        Field::new(
            name,
            ArrowType::Timestamp(TimeUnit::Nanosecond, Some(UTC_TZ.into())),
            false,
        )
    };
    Arc::new(Schema::new(vec![
        Field::new("market", ArrowType::Utf8, false),
        Field::new("data_type", ArrowType::Utf8, false),
        ts("start_date"),
        ts("end_date"),
        Field::new("rows_collected", ArrowType::UInt64, false),
        ts("collected_at"),
        Field::new("source", ArrowType::Utf8, false),
        Field::new("status", ArrowType::Utf8, false),
    ]))
}

fn entries_to_batch(entries: &[LedgerEntry]) -> Result<RecordBatch, StoreError> {
    let mut market = StringBuilder::new();
    let mut data_type = StringBuilder::new();
    let mut start = TimestampNanosecondBuilder::new().with_timezone(UTC_TZ);
    let mut end = TimestampNanosecondBuilder::new().with_timezone(UTC_TZ);
    let mut rows = UInt64Builder::new();
    let mut collected = TimestampNanosecondBuilder::new().with_timezone(UTC_TZ);
    let mut source = StringBuilder::new();
    let mut status = StringBuilder::new();

    for e in entries {
        market.append_value(&e.market);
        data_type.append_value(e.data_type.to_string());
        start.append_value(dt_to_ns(e.start_date));
        end.append_value(dt_to_ns(e.end_date));
        rows.append_value(e.rows_collected);
        collected.append_value(dt_to_ns(e.collected_at));
        source.append_value(&e.source);
        status.append_value(e.status.to_string());
    }

    Ok(RecordBatch::try_new(
        ledger_schema(),
        vec![
            Arc::new(market.finish()),
            Arc::new(data_type.finish()),
            Arc::new(start.finish()),
            Arc::new(end.finish()),
            Arc::new(rows.finish()),
            Arc::new(collected.finish()),
            Arc::new(source.finish()),
            Arc::new(status.finish()),
        ],
    )?)
}

fn batch_to_entries(batch: &RecordBatch) -> Result<Vec<LedgerEntry>, StoreError> {
    let market = string_col(batch, "market")?;
    let data_type = string_col(batch, "data_type")?;
    let start = timestamp_col(batch, "start_date")?;
    let end = timestamp_col(batch, "end_date")?;
    let rows = u64_col(batch, "rows_collected")?;
    let collected = timestamp_col(batch, "collected_at")?;
    let source = string_col(batch, "source")?;
    let status = string_col(batch, "status")?;

    let mut entries = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        entries.push(LedgerEntry {
            market: market.value(i).to_string(),
            data_type: data_type.value(i).parse().map_err(|_| StoreError::Label {
                column: "data_type".to_string(),
                value: data_type.value(i).to_string(),
            })?,
            start_date: ns_to_dt(start.value(i)),
            end_date: ns_to_dt(end.value(i)),
            rows_collected: rows.value(i),
            collected_at: ns_to_dt(collected.value(i)),
            source: source.value(i).to_string(),
            status: status.value(i).parse().map_err(|_| StoreError::Label {
                column: "status".to_string(),
                value: status.value(i).to_string(),
            })?,
        });
    }
    Ok(entries)
}
