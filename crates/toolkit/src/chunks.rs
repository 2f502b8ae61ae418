//! Range splitting for collection and storage.
//!
//! Collection requests are split at calendar-month boundaries so that one
//! upstream failure costs at most a month of refetching, and fetched rows are
//! split at calendar-year boundaries to match the store's partitioning.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use elec_database::PartitionRecord;

/// Split `[start, end)` at the first instant of each calendar month. The
/// first chunk starts at `start` and the last ends at `end`, so a range
/// within one month comes back as a single chunk.
pub fn monthly_chunks(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let mut chunks = Vec::new();
    let mut cursor = start;
    while cursor < end {
        let boundary = first_of_next_month(cursor).min(end);
        chunks.push((cursor, boundary));
        cursor = boundary;
    }
    chunks
}

fn first_of_next_month(t: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if t.month() == 12 {
        (t.year() + 1, 1)
    } else {
        (t.year(), t.month() + 1)
    };
    // Midnight on the first of a month always exists in UTC.
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(t)
}

/// Bucket rows by the calendar year of their timestamp, in year order.
pub fn split_by_year<R: PartitionRecord>(rows: Vec<R>) -> BTreeMap<i32, Vec<R>> {
    let mut by_year: BTreeMap<i32, Vec<R>> = BTreeMap::new();
    for row in rows {
        by_year.entry(row.timestamp().year()).or_default().push(row);
    }
    by_year
}
