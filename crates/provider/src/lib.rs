//! The fetch-capability seam between the toolkit and market adapters.
//!
//! A [`Collector`] wraps one source family (one upstream API) and serves one
//! or more markets, returning rows already shaped to the canonical schemas.
//! New markets are added by implementing the trait, not by touching the
//! storage or orchestration layers. Everything is synchronous: a collector
//! call blocks until the upstream responds or fails, and retry policy belongs
//! to the adapter, not to this seam.

pub mod harmonize;

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use elec_types::{DemandRow, FlowRow, GenerationRow, PriceRow};

pub trait Collector {
    /// Stable identifier recorded in the `source` column and the ledger.
    fn source_id(&self) -> &str;

    fn supported_markets(&self) -> Vec<String>;

    fn supports(&self, market: &str) -> bool {
        self.supported_markets().iter().any(|m| m == market)
    }

    fn collect_prices(
        &mut self,
        market: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceRow>>;

    fn collect_demand(
        &mut self,
        market: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DemandRow>>;

    fn collect_generation(
        &mut self,
        market: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<GenerationRow>>;

    /// Interchange flows; most source families don't publish them.
    fn collect_flows(
        &mut self,
        market: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<FlowRow>> {
        bail!("{} does not provide interchange flows for {market}", self.source_id())
    }
}

/// Lazily-populated per-market client map.
///
/// Upstream clients often need credentials only some deployments have, so
/// construction is deferred until a market is first used; a missing API key
/// for one market never blocks collectors for the others. Construction
/// failures propagate to that first use and are retried on the next.
#[derive(Debug, Default)]
pub struct ClientCache<C> {
    clients: HashMap<String, C>,
}

impl<C> ClientCache<C> {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }

    pub fn get_or_init<F>(&mut self, market: &str, init: F) -> Result<&mut C>
    where
        F: FnOnce() -> Result<C>,
    {
        match self.clients.entry(market.to_string()) {
            Entry::Occupied(slot) => Ok(slot.into_mut()),
            Entry::Vacant(slot) => {
                tracing::info!(market, "initializing market client");
                Ok(slot.insert(init()?))
            }
        }
    }
}
