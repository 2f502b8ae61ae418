//! Binding between row types and their on-disk Arrow representation.
//!
//! `PartitionRecord` is what the store needs to know about a row: its Arrow
//! schema, how to encode/decode a batch, where its timestamp lives, and which
//! fields form its dedup identity. The identity key is every field except the
//! single numeric value column, so two generation rows for different fuels at
//! the same instant are distinct observations while a re-fetch of the same
//! fuel collapses onto the stored row.

use std::hash::Hash;
use std::str::FromStr;
use std::sync::Arc;

use arrow::array::{
    Float64Builder, StringBuilder, TimestampNanosecondBuilder, UInt32Builder,
};
use arrow::datatypes::{DataType as ArrowType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use elec_types::{
    DataType, DemandRow, DemandType, FlowRow, FuelType, GenerationRow, PriceRow, PriceType,
};

use crate::error::StoreError;
use crate::parquet::{dt_to_ns, f64_col, ns_to_dt, string_col, timestamp_col, u32_col, UTC_TZ};

pub trait PartitionRecord: Clone + Sized {
    /// Dedup identity: all fields except the value column. `Ord` so merged
    /// partitions have a stable order for rows sharing a timestamp.
    type Key: Eq + Hash + Ord;

    const DATA_TYPE: DataType;

    fn schema() -> SchemaRef;
    fn timestamp(&self) -> DateTime<Utc>;
    fn identity_key(&self) -> Self::Key;
    fn to_batch(rows: &[Self]) -> Result<RecordBatch, StoreError>;
    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>, StoreError>;

    #[inline]
    fn timestamp_ns(&self) -> i64 {
        dt_to_ns(self.timestamp())
    }
}

fn ts_field(name: &str) -> Field {
    Field::new(
        name,
        ArrowType::Timestamp(TimeUnit::Nanosecond, Some(UTC_TZ.into())),
        false,
    )
}

fn ts_builder() -> TimestampNanosecondBuilder {
    TimestampNanosecondBuilder::new().with_timezone(UTC_TZ)
}

fn parse_label<T: FromStr>(column: &str, value: &str) -> Result<T, StoreError> {
    T::from_str(value).map_err(|_| StoreError::Label {
        column: column.to_string(),
        value: value.to_string(),
    })
}

// ---------- Prices ----------

impl PartitionRecord for PriceRow {
    type Key = (i64, String, String, PriceType, u32, String);

    const DATA_TYPE: DataType = DataType::Prices;

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            ts_field("timestamp_utc"),
            Field::new("market", ArrowType::Utf8, false),
            Field::new("price", ArrowType::Float64, false),
            Field::new("currency", ArrowType::Utf8, false),
            Field::new("price_type", ArrowType::Utf8, false),
            Field::new("resolution_minutes", ArrowType::UInt32, false),
            Field::new("source", ArrowType::Utf8, false),
        ]))
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp_utc
    }

    fn identity_key(&self) -> Self::Key {
        (
            self.timestamp_ns(),
            self.market.clone(),
            self.currency.clone(),
            self.price_type,
            self.resolution_minutes,
            self.source.clone(),
        )
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch, StoreError> {
        let mut ts = ts_builder();
        let mut market = StringBuilder::new();
        let mut price = Float64Builder::new();
        let mut currency = StringBuilder::new();
        let mut price_type = StringBuilder::new();
        let mut resolution = UInt32Builder::new();
        let mut source = StringBuilder::new();

        for r in rows {
            ts.append_value(r.timestamp_ns());
            market.append_value(&r.market);
            price.append_value(r.price);
            currency.append_value(&r.currency);
            price_type.append_value(r.price_type.to_string());
            resolution.append_value(r.resolution_minutes);
            source.append_value(&r.source);
        }

        Ok(RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(ts.finish()),
                Arc::new(market.finish()),
                Arc::new(price.finish()),
                Arc::new(currency.finish()),
                Arc::new(price_type.finish()),
                Arc::new(resolution.finish()),
                Arc::new(source.finish()),
            ],
        )?)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>, StoreError> {
        let ts = timestamp_col(batch, "timestamp_utc")?;
        let market = string_col(batch, "market")?;
        let price = f64_col(batch, "price")?;
        let currency = string_col(batch, "currency")?;
        let price_type = string_col(batch, "price_type")?;
        let resolution = u32_col(batch, "resolution_minutes")?;
        let source = string_col(batch, "source")?;

        let mut rows = Vec::with_capacity(batch.num_rows());
        for i in 0..batch.num_rows() {
            rows.push(PriceRow {
                timestamp_utc: ns_to_dt(ts.value(i)),
                market: market.value(i).to_string(),
                price: price.value(i),
                currency: currency.value(i).to_string(),
                price_type: parse_label("price_type", price_type.value(i))?,
                resolution_minutes: resolution.value(i),
                source: source.value(i).to_string(),
            });
        }
        Ok(rows)
    }
}

// ---------- Demand ----------

impl PartitionRecord for DemandRow {
    type Key = (i64, String, DemandType, u32, String);

    const DATA_TYPE: DataType = DataType::Demand;

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            ts_field("timestamp_utc"),
            Field::new("market", ArrowType::Utf8, false),
            Field::new("demand_mw", ArrowType::Float64, false),
            Field::new("demand_type", ArrowType::Utf8, false),
            Field::new("resolution_minutes", ArrowType::UInt32, false),
            Field::new("source", ArrowType::Utf8, false),
        ]))
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp_utc
    }

    fn identity_key(&self) -> Self::Key {
        (
            self.timestamp_ns(),
            self.market.clone(),
            self.demand_type,
            self.resolution_minutes,
            self.source.clone(),
        )
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch, StoreError> {
        let mut ts = ts_builder();
        let mut market = StringBuilder::new();
        let mut demand = Float64Builder::new();
        let mut demand_type = StringBuilder::new();
        let mut resolution = UInt32Builder::new();
        let mut source = StringBuilder::new();

        for r in rows {
            ts.append_value(r.timestamp_ns());
            market.append_value(&r.market);
            demand.append_value(r.demand_mw);
            demand_type.append_value(r.demand_type.to_string());
            resolution.append_value(r.resolution_minutes);
            source.append_value(&r.source);
        }

        Ok(RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(ts.finish()),
                Arc::new(market.finish()),
                Arc::new(demand.finish()),
                Arc::new(demand_type.finish()),
                Arc::new(resolution.finish()),
                Arc::new(source.finish()),
            ],
        )?)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>, StoreError> {
        let ts = timestamp_col(batch, "timestamp_utc")?;
        let market = string_col(batch, "market")?;
        let demand = f64_col(batch, "demand_mw")?;
        let demand_type = string_col(batch, "demand_type")?;
        let resolution = u32_col(batch, "resolution_minutes")?;
        let source = string_col(batch, "source")?;

        let mut rows = Vec::with_capacity(batch.num_rows());
        for i in 0..batch.num_rows() {
            rows.push(DemandRow {
                timestamp_utc: ns_to_dt(ts.value(i)),
                market: market.value(i).to_string(),
                demand_mw: demand.value(i),
                demand_type: parse_label("demand_type", demand_type.value(i))?,
                resolution_minutes: resolution.value(i),
                source: source.value(i).to_string(),
            });
        }
        Ok(rows)
    }
}

// ---------- Generation ----------

impl PartitionRecord for GenerationRow {
    type Key = (i64, String, FuelType, u32, String);

    const DATA_TYPE: DataType = DataType::Generation;

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            ts_field("timestamp_utc"),
            Field::new("market", ArrowType::Utf8, false),
            Field::new("fuel_type", ArrowType::Utf8, false),
            Field::new("generation_mw", ArrowType::Float64, false),
            Field::new("resolution_minutes", ArrowType::UInt32, false),
            Field::new("source", ArrowType::Utf8, false),
        ]))
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp_utc
    }

    fn identity_key(&self) -> Self::Key {
        (
            self.timestamp_ns(),
            self.market.clone(),
            self.fuel_type,
            self.resolution_minutes,
            self.source.clone(),
        )
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch, StoreError> {
        let mut ts = ts_builder();
        let mut market = StringBuilder::new();
        let mut fuel = StringBuilder::new();
        let mut generation = Float64Builder::new();
        let mut resolution = UInt32Builder::new();
        let mut source = StringBuilder::new();

        for r in rows {
            ts.append_value(r.timestamp_ns());
            market.append_value(&r.market);
            fuel.append_value(r.fuel_type.to_string());
            generation.append_value(r.generation_mw);
            resolution.append_value(r.resolution_minutes);
            source.append_value(&r.source);
        }

        Ok(RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(ts.finish()),
                Arc::new(market.finish()),
                Arc::new(fuel.finish()),
                Arc::new(generation.finish()),
                Arc::new(resolution.finish()),
                Arc::new(source.finish()),
            ],
        )?)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>, StoreError> {
        let ts = timestamp_col(batch, "timestamp_utc")?;
        let market = string_col(batch, "market")?;
        let fuel = string_col(batch, "fuel_type")?;
        let generation = f64_col(batch, "generation_mw")?;
        let resolution = u32_col(batch, "resolution_minutes")?;
        let source = string_col(batch, "source")?;

        let mut rows = Vec::with_capacity(batch.num_rows());
        for i in 0..batch.num_rows() {
            rows.push(GenerationRow {
                timestamp_utc: ns_to_dt(ts.value(i)),
                market: market.value(i).to_string(),
                fuel_type: parse_label("fuel_type", fuel.value(i))?,
                generation_mw: generation.value(i),
                resolution_minutes: resolution.value(i),
                source: source.value(i).to_string(),
            });
        }
        Ok(rows)
    }
}

// ---------- Flows ----------

impl PartitionRecord for FlowRow {
    type Key = (i64, String, String, u32, String);

    const DATA_TYPE: DataType = DataType::Flows;

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            ts_field("timestamp_utc"),
            Field::new("from_market", ArrowType::Utf8, false),
            Field::new("to_market", ArrowType::Utf8, false),
            Field::new("flow_mw", ArrowType::Float64, false),
            Field::new("resolution_minutes", ArrowType::UInt32, false),
            Field::new("source", ArrowType::Utf8, false),
        ]))
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp_utc
    }

    fn identity_key(&self) -> Self::Key {
        (
            self.timestamp_ns(),
            self.from_market.clone(),
            self.to_market.clone(),
            self.resolution_minutes,
            self.source.clone(),
        )
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch, StoreError> {
        let mut ts = ts_builder();
        let mut from_market = StringBuilder::new();
        let mut to_market = StringBuilder::new();
        let mut flow = Float64Builder::new();
        let mut resolution = UInt32Builder::new();
        let mut source = StringBuilder::new();

        for r in rows {
            ts.append_value(r.timestamp_ns());
            from_market.append_value(&r.from_market);
            to_market.append_value(&r.to_market);
            flow.append_value(r.flow_mw);
            resolution.append_value(r.resolution_minutes);
            source.append_value(&r.source);
        }

        Ok(RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(ts.finish()),
                Arc::new(from_market.finish()),
                Arc::new(to_market.finish()),
                Arc::new(flow.finish()),
                Arc::new(resolution.finish()),
                Arc::new(source.finish()),
            ],
        )?)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>, StoreError> {
        let ts = timestamp_col(batch, "timestamp_utc")?;
        let from_market = string_col(batch, "from_market")?;
        let to_market = string_col(batch, "to_market")?;
        let flow = f64_col(batch, "flow_mw")?;
        let resolution = u32_col(batch, "resolution_minutes")?;
        let source = string_col(batch, "source")?;

        let mut rows = Vec::with_capacity(batch.num_rows());
        for i in 0..batch.num_rows() {
            rows.push(FlowRow {
                timestamp_utc: ns_to_dt(ts.value(i)),
                from_market: from_market.value(i).to_string(),
                to_market: to_market.value(i).to_string(),
                flow_mw: flow.value(i),
                resolution_minutes: resolution.value(i),
                source: source.value(i).to_string(),
            });
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn price_batch_round_trip() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rows = vec![
            PriceRow::new(t, "AESO", 45.5, "CAD", PriceType::Pool, 60, "gridstatus_aeso").unwrap(),
        ];
        let batch = PriceRow::to_batch(&rows).unwrap();
        assert_eq!(batch.num_rows(), 1);
        let back = PriceRow::from_batch(&batch).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn identity_key_excludes_value() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let a = PriceRow::new(t, "AESO", 45.5, "CAD", PriceType::Pool, 60, "s").unwrap();
        let b = PriceRow::new(t, "AESO", 999.9, "CAD", PriceType::Pool, 60, "s").unwrap();
        assert_eq!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn fuel_type_distinguishes_generation_keys() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let gas = GenerationRow::new(t, "AESO", FuelType::Gas, 5000.0, 60, "s").unwrap();
        let wind = GenerationRow::new(t, "AESO", FuelType::Wind, 1200.0, 60, "s").unwrap();
        assert_ne!(gas.identity_key(), wind.identity_key());
    }
}
