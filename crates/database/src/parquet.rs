//! Parquet writers and readers used by the store and ledger.
//!
//! Writes are always full-file replacements: the batch goes to a temp file in
//! the target directory, then an atomic rename swaps it in. Readers tolerate
//! whatever row-group layout they find; column access is by name.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, Float64Array, StringArray, TimestampNanosecondArray, UInt32Array, UInt64Array,
};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use tempfile::NamedTempFile;

use crate::error::StoreError;

pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

/// Timezone tag applied to every timestamp column. All instants are stored as
/// epoch nanoseconds adjusted to UTC.
pub const UTC_TZ: &str = "UTC";

fn zstd_props(level: i32) -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::ZSTD(
            ZstdLevel::try_new(level).unwrap_or(ZstdLevel::default()),
        ))
        .set_dictionary_enabled(true)
        .set_data_page_size_limit(128 * 1024)
        .build()
}

/// Write `batch` to `path` via temp-file-then-rename so readers never observe
/// a half-written partition.
pub fn write_batch_atomic(path: &Path, batch: &RecordBatch, zstd_level: i32) -> Result<(), StoreError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let tmp = NamedTempFile::new_in(parent)?;
    let mut writer = ArrowWriter::try_new(tmp.reopen()?, batch.schema(), Some(zstd_props(zstd_level)))?;
    writer.write(batch)?;
    writer.close()?;

    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

/// Read every record batch in a Parquet file.
pub fn read_batches(path: &Path) -> Result<Vec<RecordBatch>, StoreError> {
    let file = fs::File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch?);
    }
    Ok(batches)
}

/// Row count plus min/max of a nanosecond-timestamp column, without decoding
/// the rest of the file into rows. `None` bounds mean the file is empty.
pub fn timestamp_column_stats(
    path: &Path,
    column: &str,
) -> Result<(i64, Option<(i64, i64)>), StoreError> {
    let file = fs::File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut count: i64 = 0;
    let mut min_ns = i64::MAX;
    let mut max_ns = i64::MIN;

    for batch in reader {
        let batch = batch?;
        count += batch.num_rows() as i64;
        let col = timestamp_col(&batch, column)?;
        for i in 0..col.len() {
            if col.is_null(i) {
                continue;
            }
            let v = col.value(i);
            min_ns = min_ns.min(v);
            max_ns = max_ns.max(v);
        }
    }

    if count == 0 {
        Ok((0, None))
    } else {
        Ok((count, Some((min_ns, max_ns))))
    }
}

// ---------- Column access ----------

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Arc<dyn Array>, StoreError> {
    batch.column_by_name(name).ok_or_else(|| StoreError::MissingColumn {
        column: name.to_string(),
    })
}

pub fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, StoreError> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| StoreError::ColumnType {
            column: name.to_string(),
        })
}

pub fn f64_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array, StoreError> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| StoreError::ColumnType {
            column: name.to_string(),
        })
}

pub fn u32_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array, StoreError> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| StoreError::ColumnType {
            column: name.to_string(),
        })
}

pub fn u64_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt64Array, StoreError> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<UInt64Array>()
        .ok_or_else(|| StoreError::ColumnType {
            column: name.to_string(),
        })
}

pub fn timestamp_col<'a>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a TimestampNanosecondArray, StoreError> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<TimestampNanosecondArray>()
        .ok_or_else(|| StoreError::ColumnType {
            column: name.to_string(),
        })
}

// ---------- Time conversion ----------

#[inline]
pub fn dt_to_ns(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_nanos_opt().unwrap_or(0)
}

#[inline]
pub fn ns_to_dt(ns: i64) -> DateTime<Utc> {
    let secs = ns.div_euclid(1_000_000_000);
    let nanos = ns.rem_euclid(1_000_000_000) as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos).expect("valid ns timestamp")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ns_round_trip() {
        let dt = Utc.with_ymd_and_hms(2024, 6, 15, 12, 30, 0).unwrap();
        assert_eq!(ns_to_dt(dt_to_ns(dt)), dt);
    }
}
