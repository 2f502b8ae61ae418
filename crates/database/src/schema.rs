//! Expected field sets per data type and advisory validation.
//!
//! Validation only checks field presence, never row values; extra fields are
//! allowed. Callers should validate foreign datasets before persisting them;
//! the store itself does not enforce this.

use arrow::datatypes::Schema;
use elec_types::DataType;

const PRICE_FIELDS: &[&str] = &[
    "timestamp_utc",
    "market",
    "price",
    "currency",
    "price_type",
    "resolution_minutes",
    "source",
];

const DEMAND_FIELDS: &[&str] = &[
    "timestamp_utc",
    "market",
    "demand_mw",
    "demand_type",
    "resolution_minutes",
    "source",
];

const GENERATION_FIELDS: &[&str] = &[
    "timestamp_utc",
    "market",
    "fuel_type",
    "generation_mw",
    "resolution_minutes",
    "source",
];

const FLOW_FIELDS: &[&str] = &[
    "timestamp_utc",
    "from_market",
    "to_market",
    "flow_mw",
    "resolution_minutes",
    "source",
];

/// Canonical field set for a data type.
pub fn expected_fields(data_type: DataType) -> &'static [&'static str] {
    match data_type {
        DataType::Prices => PRICE_FIELDS,
        DataType::Demand => DEMAND_FIELDS,
        DataType::Generation => GENERATION_FIELDS,
        DataType::Flows => FLOW_FIELDS,
    }
}

/// One message per missing field; empty means the dataset is valid for the
/// given data type.
pub fn validate(schema: &Schema, data_type: DataType) -> Vec<String> {
    expected_fields(data_type)
        .iter()
        .filter(|name| schema.column_with_name(name).is_none())
        .map(|name| format!("dataset missing field '{name}' required by {data_type} schema"))
        .collect()
}
