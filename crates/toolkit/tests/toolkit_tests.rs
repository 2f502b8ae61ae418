use std::cell::Cell;
use std::rc::Rc;

use anyhow::{bail, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use elec_toolkit::{Toolkit, ToolkitError};
use elec_types::{
    CollectionStatus, DataType, DemandRow, DemandType, FuelType, GenerationRow, PriceRow,
    PriceType,
};

fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

/// Collector returning canned hourly rows, counting calls so tests can assert
/// on chunking and on the store short-circuiting refetches.
struct MockCollector {
    markets: Vec<String>,
    price_calls: Rc<Cell<usize>>,
    fail: bool,
}

impl MockCollector {
    fn new() -> (Self, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let mock = Self {
            markets: vec!["AESO".to_string(), "IESO".to_string()],
            price_calls: Rc::clone(&calls),
            fail: false,
        };
        (mock, calls)
    }

    fn failing() -> Self {
        let (mut mock, _) = Self::new();
        mock.fail = true;
        mock
    }

    fn hours(start: DateTime<Utc>, n: i64) -> impl Iterator<Item = DateTime<Utc>> {
        (0..n).map(move |h| start + Duration::hours(h))
    }
}

impl elec_provider::Collector for MockCollector {
    fn source_id(&self) -> &str {
        "mock"
    }

    fn supported_markets(&self) -> Vec<String> {
        self.markets.clone()
    }

    fn collect_prices(
        &mut self,
        market: &str,
        start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<PriceRow>> {
        self.price_calls.set(self.price_calls.get() + 1);
        if self.fail {
            bail!("upstream returned 503");
        }
        Ok(Self::hours(start, 24)
            .enumerate()
            .map(|(i, ts)| {
                PriceRow::new(ts, market, 50.0 + i as f64, "CAD", PriceType::Pool, 60, "mock")
                    .unwrap()
            })
            .collect())
    }

    fn collect_demand(
        &mut self,
        market: &str,
        start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<DemandRow>> {
        if self.fail {
            bail!("upstream returned 503");
        }
        Ok(Self::hours(start, 24)
            .enumerate()
            .map(|(i, ts)| {
                DemandRow::new(ts, market, 9000.0 + i as f64 * 10.0, DemandType::Actual, 60, "mock")
                    .unwrap()
            })
            .collect())
    }

    fn collect_generation(
        &mut self,
        market: &str,
        start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<GenerationRow>> {
        if self.fail {
            bail!("upstream returned 503");
        }
        let mut rows = Vec::new();
        for ts in Self::hours(start, 4) {
            for (fuel, mw) in [
                (FuelType::Gas, 5000.0),
                (FuelType::Wind, 1200.0),
                (FuelType::Solar, 600.0),
            ] {
                rows.push(GenerationRow::new(ts, market, fuel, mw, 60, "mock").unwrap());
            }
        }
        Ok(rows)
    }
}

fn toolkit() -> (Toolkit, Rc<Cell<usize>>, tempfile::TempDir) {
    let root = tempfile::tempdir().expect("tempdir");
    let (mock, calls) = MockCollector::new();
    let tk = Toolkit::new(root.path(), vec![Box::new(mock)]).expect("toolkit");
    (tk, calls, root)
}

// ---- construction ----

#[test]
fn new_creates_data_dir() -> Result<()> {
    let root = tempfile::tempdir()?;
    let dir = root.path().join("new_data");
    Toolkit::new(&dir, Vec::new())?;
    assert!(dir.exists());
    Ok(())
}

// ---- collect ----

#[test]
fn collect_stores_data() -> Result<()> {
    let (mut tk, _, _root) = toolkit();
    tk.collect(&["AESO"], &[DataType::Prices], utc(2024, 1, 1), utc(2024, 2, 1))?;
    let rows: Vec<PriceRow> = tk.store().read("AESO", utc(2024, 1, 1), utc(2024, 2, 1))?;
    assert!(!rows.is_empty());
    Ok(())
}

#[test]
fn collect_logs_success() -> Result<()> {
    let (mut tk, _, _root) = toolkit();
    tk.collect(&["AESO"], &[DataType::Prices], utc(2024, 1, 1), utc(2024, 2, 1))?;
    let status = tk.status()?;
    assert!(status.iter().any(|s| s.market == "AESO" && s.data_type == DataType::Prices));
    Ok(())
}

#[test]
fn collect_multiple_data_types() -> Result<()> {
    let (mut tk, _, _root) = toolkit();
    tk.collect(
        &["AESO"],
        &[DataType::Prices, DataType::Demand],
        utc(2024, 1, 1),
        utc(2024, 2, 1),
    )?;
    let prices: Vec<PriceRow> = tk.store().read("AESO", utc(2024, 1, 1), utc(2024, 2, 1))?;
    let demand: Vec<DemandRow> = tk.store().read("AESO", utc(2024, 1, 1), utc(2024, 2, 1))?;
    assert!(!prices.is_empty());
    assert!(!demand.is_empty());
    Ok(())
}

#[test]
fn collect_multiple_markets() -> Result<()> {
    let (mut tk, _, _root) = toolkit();
    tk.collect(&["AESO", "IESO"], &[DataType::Prices], utc(2024, 1, 1), utc(2024, 2, 1))?;
    let aeso: Vec<PriceRow> = tk.store().read("AESO", utc(2024, 1, 1), utc(2024, 2, 1))?;
    let ieso: Vec<PriceRow> = tk.store().read("IESO", utc(2024, 1, 1), utc(2024, 2, 1))?;
    assert!(!aeso.is_empty());
    assert!(!ieso.is_empty());
    Ok(())
}

#[test]
fn collect_unsupported_market_logs_error_without_aborting() -> Result<()> {
    let (mut tk, _, _root) = toolkit();
    tk.collect(&["FAKE_MARKET"], &[DataType::Prices], utc(2024, 1, 1), utc(2024, 2, 1))?;

    let stored: Vec<PriceRow> = tk.store().read("FAKE_MARKET", utc(2024, 1, 1), utc(2024, 2, 1))?;
    assert!(stored.is_empty());

    let entries = tk.ledger().entries()?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].market, "FAKE_MARKET");
    assert_eq!(entries[0].status, CollectionStatus::Error);
    assert_eq!(entries[0].rows_collected, 0);
    Ok(())
}

#[test]
fn collect_chunks_by_month() -> Result<()> {
    let (mut tk, calls, _root) = toolkit();
    tk.collect(&["AESO"], &[DataType::Prices], utc(2024, 1, 1), utc(2024, 3, 1))?;
    // January and February, one fetch each.
    assert_eq!(calls.get(), 2);
    assert_eq!(tk.ledger().entries()?.len(), 2);
    Ok(())
}

#[test]
fn collect_failed_chunk_logs_error_and_continues() -> Result<()> {
    let root = tempfile::tempdir()?;
    let mut tk = Toolkit::new(root.path(), vec![Box::new(MockCollector::failing())])?;
    tk.collect(&["AESO"], &[DataType::Prices], utc(2024, 1, 1), utc(2024, 3, 1))?;

    let entries = tk.ledger().entries()?;
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.status == CollectionStatus::Error));
    assert!(tk.status()?.is_empty());
    Ok(())
}

#[test]
fn collect_flows_without_source_support_logs_error() -> Result<()> {
    let (mut tk, _, _root) = toolkit();
    tk.collect(&["AESO"], &[DataType::Flows], utc(2024, 1, 1), utc(2024, 2, 1))?;
    let entries = tk.ledger().entries()?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].data_type, DataType::Flows);
    assert_eq!(entries[0].status, CollectionStatus::Error);
    Ok(())
}

// ---- get_prices ----

#[test]
fn get_auto_fetches_when_store_is_empty() -> Result<()> {
    let (mut tk, calls, _root) = toolkit();
    let rows = tk.get_prices(&["AESO"], utc(2024, 1, 1), utc(2024, 2, 1))?;
    assert_eq!(rows.len(), 24);
    assert_eq!(calls.get(), 1);
    // The fetch is recorded like any other collection.
    assert!(tk.status()?.iter().any(|s| s.market == "AESO"));
    Ok(())
}

#[test]
fn get_serves_from_store_without_refetching() -> Result<()> {
    let (mut tk, calls, _root) = toolkit();
    tk.collect(&["AESO"], &[DataType::Prices], utc(2024, 1, 1), utc(2024, 2, 1))?;
    let after_collect = calls.get();

    let rows = tk.get_prices(&["AESO"], utc(2024, 1, 1), utc(2024, 2, 1))?;
    assert!(!rows.is_empty());
    assert_eq!(calls.get(), after_collect);
    Ok(())
}

#[test]
fn get_results_sorted_by_timestamp() -> Result<()> {
    let (mut tk, _, _root) = toolkit();
    let rows = tk.get_prices(&["AESO", "IESO"], utc(2024, 1, 1), utc(2024, 2, 1))?;
    let stamps: Vec<_> = rows.iter().map(|r| r.timestamp_utc).collect();
    let mut sorted = stamps.clone();
    sorted.sort();
    assert_eq!(stamps, sorted);
    Ok(())
}

#[test]
fn get_empty_markets_returns_empty() -> Result<()> {
    let (mut tk, calls, _root) = toolkit();
    let rows = tk.get_prices(&[], utc(2024, 1, 1), utc(2024, 2, 1))?;
    assert!(rows.is_empty());
    assert_eq!(calls.get(), 0);
    Ok(())
}

#[test]
fn get_spans_multiple_markets() -> Result<()> {
    let (mut tk, _, _root) = toolkit();
    let rows = tk.get_prices(&["AESO", "IESO"], utc(2024, 1, 1), utc(2024, 2, 1))?;
    assert!(rows.iter().any(|r| r.market == "AESO"));
    assert!(rows.iter().any(|r| r.market == "IESO"));
    Ok(())
}

#[test]
fn get_unsupported_market_fails_loudly() {
    let (mut tk, _, _root) = toolkit();
    let err = tk
        .get_prices(&["FAKE"], utc(2024, 1, 1), utc(2024, 2, 1))
        .unwrap_err();
    match err {
        ToolkitError::UnsupportedMarket { market, supported } => {
            assert_eq!(market, "FAKE");
            assert!(supported.contains("AESO"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn get_fetch_failure_yields_no_rows_and_error_entry() -> Result<()> {
    let root = tempfile::tempdir()?;
    let mut tk = Toolkit::new(root.path(), vec![Box::new(MockCollector::failing())])?;
    let rows = tk.get_prices(&["AESO"], utc(2024, 1, 1), utc(2024, 2, 1))?;
    assert!(rows.is_empty());

    let entries = tk.ledger().entries()?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, CollectionStatus::Error);
    Ok(())
}

// ---- get_demand / get_generation ----

#[test]
fn get_demand_returns_rows() -> Result<()> {
    let (mut tk, _, _root) = toolkit();
    let rows = tk.get_demand(&["AESO"], utc(2024, 1, 1), utc(2024, 2, 1))?;
    assert_eq!(rows.len(), 24);
    assert_eq!(rows[0].demand_type, DemandType::Actual);
    Ok(())
}

#[test]
fn get_generation_full_mix() -> Result<()> {
    let (mut tk, _, _root) = toolkit();
    let rows = tk.get_generation(&["AESO"], utc(2024, 1, 1), utc(2024, 2, 1), None)?;
    // 4 timestamps x 3 fuels
    assert_eq!(rows.len(), 12);
    Ok(())
}

#[test]
fn get_generation_fuel_filter() -> Result<()> {
    let (mut tk, _, _root) = toolkit();
    let rows = tk.get_generation(
        &["AESO"],
        utc(2024, 1, 1),
        utc(2024, 2, 1),
        Some(&[FuelType::Wind]),
    )?;
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|r| r.fuel_type == FuelType::Wind));
    Ok(())
}

#[test]
fn get_generation_fuel_filter_multiple() -> Result<()> {
    let (mut tk, _, _root) = toolkit();
    let rows = tk.get_generation(
        &["AESO"],
        utc(2024, 1, 1),
        utc(2024, 2, 1),
        Some(&[FuelType::Wind, FuelType::Solar]),
    )?;
    assert!(!rows.is_empty());
    assert!(rows
        .iter()
        .all(|r| matches!(r.fuel_type, FuelType::Wind | FuelType::Solar)));
    Ok(())
}

// ---- status / introspection ----

#[test]
fn status_empty_before_any_collection() -> Result<()> {
    let (tk, _, _root) = toolkit();
    assert!(tk.status()?.is_empty());
    Ok(())
}

#[test]
fn status_shows_collected_types() -> Result<()> {
    let (mut tk, _, _root) = toolkit();
    tk.collect(
        &["AESO"],
        &[DataType::Prices, DataType::Demand],
        utc(2024, 1, 1),
        utc(2024, 2, 1),
    )?;
    let status = tk.status()?;
    assert_eq!(status.len(), 2);
    let types: Vec<DataType> = status.iter().map(|s| s.data_type).collect();
    assert!(types.contains(&DataType::Prices));
    assert!(types.contains(&DataType::Demand));
    Ok(())
}

#[test]
fn list_markets_and_date_range_proxy_the_store() -> Result<()> {
    let (mut tk, _, _root) = toolkit();
    assert!(tk.list_markets()?.is_empty());
    assert!(tk.date_range::<PriceRow>("AESO")?.is_none());

    tk.collect(&["AESO"], &[DataType::Prices], utc(2024, 1, 1), utc(2024, 2, 1))?;
    assert_eq!(tk.list_markets()?, vec!["aeso".to_string()]);

    let (min_ts, max_ts) = tk.date_range::<PriceRow>("AESO")?.expect("bounds");
    assert_eq!(min_ts, utc(2024, 1, 1));
    assert!(max_ts > min_ts);
    Ok(())
}
