//! Storage-friendly record shapes shared by every market adapter.
//!
//! Rows are flat: one timestamp, one numeric value, categorical context.
//! Timestamps are always `DateTime<Utc>`; adapters convert from local market
//! time before constructing a row. The checked constructors enforce the
//! bounds that make a row storable (`resolution_minutes > 0`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("resolution_minutes must be positive, got {0}")]
    NonPositiveResolution(u32),
}

/// What's stored (determines folder layout + schema columns).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum DataType {
    Prices,
    Demand,
    Generation,
    Flows,
}

impl DataType {
    pub const ALL: [DataType; 4] = [
        DataType::Prices,
        DataType::Demand,
        DataType::Generation,
        DataType::Flows,
    ];
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum PriceType {
    DayAhead,
    RealTime,
    Intraday,
    Imbalance,
    Pool,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum DemandType {
    Actual,
    ForecastDayAhead,
    ForecastIntraday,
}

/// Harmonized generation-source label. Market-specific raw category names are
/// mapped onto these before a `GenerationRow` is built.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum FuelType {
    Coal,
    Gas,
    Nuclear,
    Hydro,
    Wind,
    Solar,
    Biomass,
    Oil,
    Storage,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub timestamp_utc: DateTime<Utc>,
    pub market: String,
    pub price: f64,
    pub currency: String,
    pub price_type: PriceType,
    pub resolution_minutes: u32,
    pub source: String,
}

impl PriceRow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        timestamp_utc: DateTime<Utc>,
        market: impl Into<String>,
        price: f64,
        currency: impl Into<String>,
        price_type: PriceType,
        resolution_minutes: u32,
        source: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        check_resolution(resolution_minutes)?;
        Ok(Self {
            timestamp_utc,
            market: market.into(),
            price,
            currency: currency.into(),
            price_type,
            resolution_minutes,
            source: source.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandRow {
    pub timestamp_utc: DateTime<Utc>,
    pub market: String,
    pub demand_mw: f64,
    pub demand_type: DemandType,
    pub resolution_minutes: u32,
    pub source: String,
}

impl DemandRow {
    pub fn new(
        timestamp_utc: DateTime<Utc>,
        market: impl Into<String>,
        demand_mw: f64,
        demand_type: DemandType,
        resolution_minutes: u32,
        source: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        check_resolution(resolution_minutes)?;
        Ok(Self {
            timestamp_utc,
            market: market.into(),
            demand_mw,
            demand_type,
            resolution_minutes,
            source: source.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRow {
    pub timestamp_utc: DateTime<Utc>,
    pub market: String,
    pub fuel_type: FuelType,
    pub generation_mw: f64,
    pub resolution_minutes: u32,
    pub source: String,
}

impl GenerationRow {
    pub fn new(
        timestamp_utc: DateTime<Utc>,
        market: impl Into<String>,
        fuel_type: FuelType,
        generation_mw: f64,
        resolution_minutes: u32,
        source: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        check_resolution(resolution_minutes)?;
        Ok(Self {
            timestamp_utc,
            market: market.into(),
            fuel_type,
            generation_mw,
            resolution_minutes,
            source: source.into(),
        })
    }
}

/// Interchange between two markets; positive flow runs `from_market` -> `to_market`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRow {
    pub timestamp_utc: DateTime<Utc>,
    pub from_market: String,
    pub to_market: String,
    pub flow_mw: f64,
    pub resolution_minutes: u32,
    pub source: String,
}

impl FlowRow {
    pub fn new(
        timestamp_utc: DateTime<Utc>,
        from_market: impl Into<String>,
        to_market: impl Into<String>,
        flow_mw: f64,
        resolution_minutes: u32,
        source: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        check_resolution(resolution_minutes)?;
        Ok(Self {
            timestamp_utc,
            from_market: from_market.into(),
            to_market: to_market.into(),
            flow_mw,
            resolution_minutes,
            source: source.into(),
        })
    }
}

fn check_resolution(minutes: u32) -> Result<(), ValidationError> {
    if minutes == 0 {
        return Err(ValidationError::NonPositiveResolution(minutes));
    }
    Ok(())
}
