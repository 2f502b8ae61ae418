//! Canonical data model for harmonized electricity-market time series.
//!
//! Every market feed, whatever its native shape, is flattened into one of the
//! record types in [`records`] before persistence: UTC timestamps, one numeric
//! value column, categorical fields drawn from closed enums. [`collection`]
//! holds the ledger-entry shapes used to track what has been collected, and
//! [`registry`] provides metadata lookups (timezone, currency, native
//! resolution) per market.

pub mod collection;
pub mod records;
pub mod registry;

pub use collection::{CollectionStatus, CollectionSummary, LedgerEntry};
pub use records::{
    DataType, DemandRow, DemandType, FlowRow, FuelType, GenerationRow, PriceRow, PriceType,
    ValidationError,
};
pub use registry::{MarketMeta, MarketRegistry, RegistryError};
