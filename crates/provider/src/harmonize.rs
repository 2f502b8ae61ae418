//! Raw operator fuel labels mapped onto the harmonized [`FuelType`] set.
//!
//! Operators report generation in wide tables with their own category names;
//! several raw categories can land on the same harmonized fuel (all four AESO
//! gas variants become `gas`), in which case [`sum_by_fuel`] folds the rows
//! into one observation per (timestamp, fuel).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use elec_types::{FuelType, GenerationRow};

/// AESO fuel-mix column names.
pub fn aeso_fuel(raw: &str) -> Option<FuelType> {
    match raw {
        "Cogeneration" | "Combined Cycle" | "Gas Fired Steam" | "Simple Cycle" => {
            Some(FuelType::Gas)
        }
        "Coal" => Some(FuelType::Coal),
        "Hydro" => Some(FuelType::Hydro),
        "Wind" => Some(FuelType::Wind),
        "Solar" => Some(FuelType::Solar),
        "Energy Storage" => Some(FuelType::Storage),
        "Other" => Some(FuelType::Other),
        _ => None,
    }
}

/// IESO fuel-mix column names.
pub fn ieso_fuel(raw: &str) -> Option<FuelType> {
    match raw {
        "Gas" => Some(FuelType::Gas),
        "Hydro" => Some(FuelType::Hydro),
        "Nuclear" => Some(FuelType::Nuclear),
        "Wind" => Some(FuelType::Wind),
        "Solar" => Some(FuelType::Solar),
        "Biofuel" => Some(FuelType::Biomass),
        "Other" => Some(FuelType::Other),
        _ => None,
    }
}

/// Sum generation rows that harmonized onto the same (timestamp, fuel),
/// keeping the remaining fields of the first row seen. Output is ordered by
/// timestamp then fuel.
pub fn sum_by_fuel(rows: Vec<GenerationRow>) -> Vec<GenerationRow> {
    let mut grouped: BTreeMap<(DateTime<Utc>, FuelType), GenerationRow> = BTreeMap::new();
    for row in rows {
        grouped
            .entry((row.timestamp_utc, row.fuel_type))
            .and_modify(|acc| acc.generation_mw += row.generation_mw)
            .or_insert(row);
    }
    grouped.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn aeso_gas_variants_all_map_to_gas() {
        for raw in ["Cogeneration", "Combined Cycle", "Gas Fired Steam", "Simple Cycle"] {
            assert_eq!(aeso_fuel(raw), Some(FuelType::Gas));
        }
    }

    #[test]
    fn unknown_labels_map_to_none() {
        assert_eq!(aeso_fuel("Dual Fuel"), None);
        assert_eq!(ieso_fuel("Coal"), None);
    }

    #[test]
    fn ieso_biofuel_is_biomass() {
        assert_eq!(ieso_fuel("Biofuel"), Some(FuelType::Biomass));
    }

    #[test]
    fn sum_by_fuel_folds_same_target_rows() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rows = vec![
            GenerationRow::new(t, "AESO", FuelType::Gas, 1000.0, 60, "gridstatus_aeso").unwrap(),
            GenerationRow::new(t, "AESO", FuelType::Gas, 2500.0, 60, "gridstatus_aeso").unwrap(),
            GenerationRow::new(t, "AESO", FuelType::Wind, 800.0, 60, "gridstatus_aeso").unwrap(),
        ];
        let summed = sum_by_fuel(rows);
        assert_eq!(summed.len(), 2);
        assert_eq!(summed[0].fuel_type, FuelType::Gas);
        assert_eq!(summed[0].generation_mw, 3500.0);
        assert_eq!(summed[1].fuel_type, FuelType::Wind);
    }
}
