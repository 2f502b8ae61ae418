//! Partitioned Parquet storage for harmonized electricity-market data.
//!
//! This crate provides a small file-based data lake with:
//! - Year-partitioned Parquet files per (market, data type), written with ZSTD
//!   compression and merged deterministically on every write (dedup by
//!   identity key, last write wins, sorted by timestamp).
//! - Range reads that span year partitions transparently.
//! - An append-only collection ledger used for freshness and gap queries over
//!   arbitrary date ranges.
//!
//! Layout overview (see `paths`):
//! `{root}/raw/{market_lowercased}/{data_type}/{year}.parquet` for partitions,
//! `{root}/metadata/collection_log.parquet` for the ledger.
//!
//! Key modules:
//! - `paths`: authoritative path building and deterministic file naming.
//! - `record`: the `PartitionRecord` trait binding a row type to its Arrow
//!   schema, timestamp, and dedup identity key.
//! - `parquet`: ZSTD Parquet writers, atomic replacement, and fast stats
//!   readers used by the store.
//! - `schema`: expected field sets per data type and advisory validation.
//! - `store`: `PartitionStore`, with write/merge, range read, coverage bounds,
//!   and dataset enumeration.
//! - `ledger`: `CollectionLedger`, an append-only collection log with
//!   latest-coverage and gap detection queries.
//!
//! Everything here is synchronous, blocking I/O with whole-file
//! read-modify-rewrite; at most one writer may operate on a given partition
//! or on the ledger file at a time.

pub mod error;
pub mod ledger;
pub mod paths;
pub mod parquet;
pub mod record;
pub mod schema;
pub mod store;

pub use error::StoreError;
pub use ledger::CollectionLedger;
pub use record::PartitionRecord;
pub use store::PartitionStore;
