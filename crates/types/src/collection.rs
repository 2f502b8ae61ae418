//! Collection-ledger entry shapes.
//!
//! One [`LedgerEntry`] is appended per collection attempt and never mutated
//! afterwards. Error-status entries are kept for audit but never count as
//! coverage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::records::DataType;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum CollectionStatus {
    Success,
    Error,
}

/// One collection attempt over `[start_date, end_date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub market: String,
    pub data_type: DataType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub rows_collected: u64,
    pub collected_at: DateTime<Utc>,
    pub source: String,
    pub status: CollectionStatus,
}

/// Per-(market, data_type) rollup of successful collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub market: String,
    pub data_type: DataType,
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
    pub total_rows: u64,
    pub last_collected: DateTime<Utc>,
}
