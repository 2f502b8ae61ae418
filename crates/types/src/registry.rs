//! Market metadata registry.
//!
//! Loads a JSON registry once and exposes typed lookups so the rest of the
//! workspace never hardcodes timezone, currency, or resolution values.
//! Changing a market's metadata is a registry edit, not a code change.

use std::collections::BTreeMap;
use std::path::Path;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::records::DataType;

const BUNDLED_REGISTRY: &str = include_str!("market_registry.json");

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown market: {0}")]
    UnknownMarket(String),
    #[error("no native {data_type} resolution registered for market {market}")]
    MissingResolution { market: String, data_type: DataType },
    #[error("market {market} has invalid timezone {timezone:?}")]
    InvalidTimezone { market: String, timezone: String },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Metadata for one market. Resolution fields are optional because not every
/// market publishes every data type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketMeta {
    pub full_name: String,
    pub country: String,
    pub timezone: String,
    pub currency: String,
    #[serde(default)]
    pub native_price_resolution_minutes: Option<u32>,
    #[serde(default)]
    pub native_demand_resolution_minutes: Option<u32>,
    #[serde(default)]
    pub native_generation_resolution_minutes: Option<u32>,
    #[serde(default)]
    pub native_flows_resolution_minutes: Option<u32>,
}

impl MarketMeta {
    fn native_resolution(&self, data_type: DataType) -> Option<u32> {
        match data_type {
            DataType::Prices => self.native_price_resolution_minutes,
            DataType::Demand => self.native_demand_resolution_minutes,
            DataType::Generation => self.native_generation_resolution_minutes,
            DataType::Flows => self.native_flows_resolution_minutes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MarketRegistry {
    markets: BTreeMap<String, MarketMeta>,
}

impl MarketRegistry {
    /// Registry bundled with the crate. The JSON is compiled in, so a parse
    /// failure here is a build defect, not a runtime condition.
    pub fn bundled() -> Self {
        let markets =
            serde_json::from_str(BUNDLED_REGISTRY).expect("bundled market registry is valid JSON");
        Self { markets }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let raw = std::fs::read_to_string(path)?;
        let markets = serde_json::from_str(&raw)?;
        Ok(Self { markets })
    }

    pub fn get(&self, market: &str) -> Result<&MarketMeta, RegistryError> {
        self.markets
            .get(market)
            .ok_or_else(|| RegistryError::UnknownMarket(market.to_string()))
    }

    /// All registered market identifiers, sorted.
    pub fn list_markets(&self) -> Vec<String> {
        self.markets.keys().cloned().collect()
    }

    pub fn timezone(&self, market: &str) -> Result<Tz, RegistryError> {
        let meta = self.get(market)?;
        meta.timezone
            .parse()
            .map_err(|_| RegistryError::InvalidTimezone {
                market: market.to_string(),
                timezone: meta.timezone.clone(),
            })
    }

    pub fn currency(&self, market: &str) -> Result<&str, RegistryError> {
        Ok(&self.get(market)?.currency)
    }

    pub fn native_resolution(&self, market: &str, data_type: DataType) -> Result<u32, RegistryError> {
        self.get(market)?
            .native_resolution(data_type)
            .ok_or_else(|| RegistryError::MissingResolution {
                market: market.to_string(),
                data_type,
            })
    }
}

impl Default for MarketRegistry {
    fn default() -> Self {
        Self::bundled()
    }
}
