//! User-facing facade over the store, the ledger, and the collectors.
//!
//! [`Toolkit`] is the one type applications hold. Reads go through the store
//! first and fall back to a collector only when the store has nothing for the
//! market, so repeated queries never refetch. Bulk collection runs in
//! calendar-month chunks and records every attempt in the ledger, successful
//! or not; a failing chunk never aborts the rest of the batch.

pub mod chunks;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::warn;

use elec_database::{CollectionLedger, PartitionRecord, PartitionStore, StoreError};
use elec_provider::Collector;
use elec_types::{
    CollectionStatus, CollectionSummary, DataType, DemandRow, FlowRow, FuelType, GenerationRow,
    MarketRegistry, PriceRow,
};

#[derive(Debug, Error)]
pub enum ToolkitError {
    #[error("market {market} is not supported by any collector (supported: {supported})")]
    UnsupportedMarket { market: String, supported: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Toolkit {
    store: PartitionStore,
    ledger: CollectionLedger,
    registry: MarketRegistry,
    collectors: Vec<Box<dyn Collector>>,
}

impl Toolkit {
    /// Open (creating if needed) the data directory at `data_dir` and wire up
    /// the given collectors. Collector order is the lookup order when more
    /// than one supports a market.
    pub fn new(
        data_dir: impl Into<PathBuf>,
        collectors: Vec<Box<dyn Collector>>,
    ) -> Result<Self, ToolkitError> {
        let data_dir = data_dir.into();
        Ok(Self {
            store: PartitionStore::new(&data_dir)?,
            ledger: CollectionLedger::new(&data_dir)?,
            registry: MarketRegistry::bundled(),
            collectors,
        })
    }

    pub fn store(&self) -> &PartitionStore {
        &self.store
    }

    pub fn ledger(&self) -> &CollectionLedger {
        &self.ledger
    }

    pub fn registry(&self) -> &MarketRegistry {
        &self.registry
    }

    // ---------- Queries ----------

    pub fn get_prices(
        &mut self,
        markets: &[&str],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceRow>, ToolkitError> {
        self.get_rows(markets, start, end, |c, m, s, e| c.collect_prices(m, s, e))
    }

    pub fn get_demand(
        &mut self,
        markets: &[&str],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DemandRow>, ToolkitError> {
        self.get_rows(markets, start, end, |c, m, s, e| c.collect_demand(m, s, e))
    }

    /// Generation by fuel. `fuel_types` narrows the result to the listed
    /// fuels; `None` returns the full mix.
    pub fn get_generation(
        &mut self,
        markets: &[&str],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        fuel_types: Option<&[FuelType]>,
    ) -> Result<Vec<GenerationRow>, ToolkitError> {
        let mut rows: Vec<GenerationRow> =
            self.get_rows(markets, start, end, |c, m, s, e| c.collect_generation(m, s, e))?;
        if let Some(fuels) = fuel_types {
            rows.retain(|r| fuels.contains(&r.fuel_type));
        }
        Ok(rows)
    }

    pub fn get_flows(
        &mut self,
        markets: &[&str],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<FlowRow>, ToolkitError> {
        self.get_rows(markets, start, end, |c, m, s, e| c.collect_flows(m, s, e))
    }

    /// Read-through per market: serve from the store when it has any rows in
    /// range, otherwise fetch, persist, log, and re-read. A fetch failure is
    /// logged as an error entry and that market contributes nothing; an
    /// unregistered market fails the whole query.
    fn get_rows<R, F>(
        &mut self,
        markets: &[&str],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        fetch: F,
    ) -> Result<Vec<R>, ToolkitError>
    where
        R: PartitionRecord,
        F: Fn(
            &mut dyn Collector,
            &str,
            DateTime<Utc>,
            DateTime<Utc>,
        ) -> anyhow::Result<Vec<R>>,
    {
        let mut out: Vec<R> = Vec::new();
        for market in markets {
            let stored: Vec<R> = self.store.read(market, start, end)?;
            if !stored.is_empty() {
                out.extend(stored);
                continue;
            }

            let idx = self.collector_index(market)?;
            let source = self.collectors[idx].source_id().to_string();
            match fetch(self.collectors[idx].as_mut(), market, start, end) {
                Ok(rows) => {
                    let fetched = rows.len() as u64;
                    for (year, slice) in chunks::split_by_year(rows) {
                        self.store.write(&slice, market, year)?;
                    }
                    self.ledger.log(
                        market,
                        R::DATA_TYPE,
                        start,
                        end,
                        fetched,
                        &source,
                        CollectionStatus::Success,
                    )?;
                    out.extend(self.store.read::<R>(market, start, end)?);
                }
                Err(err) => {
                    warn!(market, data_type = %R::DATA_TYPE, error = %err, "fetch failed");
                    self.ledger.log(
                        market,
                        R::DATA_TYPE,
                        start,
                        end,
                        0,
                        &source,
                        CollectionStatus::Error,
                    )?;
                }
            }
        }
        out.sort_by_cached_key(|r| (r.timestamp_ns(), r.identity_key()));
        Ok(out)
    }

    // ---------- Bulk collection ----------

    /// Collect every (market, data_type) pair over `[start, end)` in
    /// calendar-month chunks, one ledger entry per chunk. Failed chunks and
    /// unsupported markets are logged as error entries and skipped; only
    /// ledger I/O itself can abort the batch.
    pub fn collect(
        &mut self,
        markets: &[&str],
        data_types: &[DataType],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), ToolkitError> {
        for market in markets {
            let idx = match self.collector_index(market) {
                Ok(idx) => idx,
                Err(err) => {
                    warn!(market, error = %err, "skipping unsupported market");
                    for &data_type in data_types {
                        self.ledger.log(
                            market,
                            data_type,
                            start,
                            end,
                            0,
                            "unregistered",
                            CollectionStatus::Error,
                        )?;
                    }
                    continue;
                }
            };
            for &data_type in data_types {
                for (chunk_start, chunk_end) in chunks::monthly_chunks(start, end) {
                    self.collect_chunk(idx, market, data_type, chunk_start, chunk_end)?;
                }
            }
        }
        Ok(())
    }

    fn collect_chunk(
        &mut self,
        idx: usize,
        market: &str,
        data_type: DataType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), ToolkitError> {
        let source = self.collectors[idx].source_id().to_string();
        let outcome: anyhow::Result<u64> = match data_type {
            DataType::Prices => self.collectors[idx]
                .collect_prices(market, start, end)
                .and_then(|rows| Ok(self.write_split(rows, market)?)),
            DataType::Demand => self.collectors[idx]
                .collect_demand(market, start, end)
                .and_then(|rows| Ok(self.write_split(rows, market)?)),
            DataType::Generation => self.collectors[idx]
                .collect_generation(market, start, end)
                .and_then(|rows| Ok(self.write_split(rows, market)?)),
            DataType::Flows => self.collectors[idx]
                .collect_flows(market, start, end)
                .and_then(|rows| Ok(self.write_split(rows, market)?)),
        };

        match outcome {
            Ok(rows) => self.ledger.log(
                market,
                data_type,
                start,
                end,
                rows,
                &source,
                CollectionStatus::Success,
            )?,
            Err(err) => {
                warn!(
                    market,
                    data_type = %data_type,
                    start = %start,
                    end = %end,
                    error = %err,
                    "collection chunk failed"
                );
                self.ledger.log(
                    market,
                    data_type,
                    start,
                    end,
                    0,
                    &source,
                    CollectionStatus::Error,
                )?;
            }
        }
        Ok(())
    }

    fn write_split<R: PartitionRecord>(
        &self,
        rows: Vec<R>,
        market: &str,
    ) -> Result<u64, StoreError> {
        let total = rows.len() as u64;
        for (year, slice) in chunks::split_by_year(rows) {
            self.store.write(&slice, market, year)?;
        }
        Ok(total)
    }

    // ---------- Introspection ----------

    /// Ledger summary of everything successfully collected.
    pub fn status(&self) -> Result<Vec<CollectionSummary>, ToolkitError> {
        Ok(self.ledger.status()?)
    }

    /// Markets present in the store (lowercased directory names).
    pub fn list_markets(&self) -> Result<Vec<String>, ToolkitError> {
        Ok(self.store.list_markets()?)
    }

    /// Stored timestamp bounds for one (market, record type) pair.
    pub fn date_range<R: PartitionRecord>(
        &self,
        market: &str,
    ) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, ToolkitError> {
        Ok(self.store.date_range::<R>(market)?)
    }

    fn collector_index(&self, market: &str) -> Result<usize, ToolkitError> {
        self.collectors
            .iter()
            .position(|c| c.supports(market))
            .ok_or_else(|| {
                let mut supported: Vec<String> = self
                    .collectors
                    .iter()
                    .flat_map(|c| c.supported_markets())
                    .collect();
                supported.sort();
                supported.dedup();
                ToolkitError::UnsupportedMarket {
                    market: market.to_string(),
                    supported: supported.join(", "),
                }
            })
    }
}
