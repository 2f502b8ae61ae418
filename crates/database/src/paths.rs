//! Authoritative path building for partitions and the ledger.
//!
//! Market identifiers are lowercased at the storage boundary only; the public
//! APIs accept canonical casing. Changing this layout is part of the storage
//! contract and would require a migration.

use std::path::{Path, PathBuf};

use elec_types::DataType;

pub const PARTITION_EXT: &str = "parquet";

pub fn raw_root(root: &Path) -> PathBuf {
    root.join("raw")
}

pub fn market_dir(root: &Path, market: &str) -> PathBuf {
    raw_root(root).join(market.to_lowercase())
}

pub fn dataset_dir(root: &Path, market: &str, data_type: DataType) -> PathBuf {
    market_dir(root, market).join(data_type.to_string())
}

/// One file per (market, data_type, year).
pub fn partition_path(root: &Path, market: &str, data_type: DataType, year: i32) -> PathBuf {
    dataset_dir(root, market, data_type).join(format!("{year}.{PARTITION_EXT}"))
}

pub fn ledger_path(root: &Path) -> PathBuf {
    root.join("metadata").join(format!("collection_log.{PARTITION_EXT}"))
}
