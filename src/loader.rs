// 📂 CSV loader - read one import's worth of source files from a directory

use crate::models::RecordSet;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::info;

pub const TRANSACTIONS_FILE: &str = "transactions.csv";
pub const PRODUCTS_FILE: &str = "products.csv";
pub const WAREHOUSES_FILE: &str = "warehouses.csv";
pub const LICENSES_FILE: &str = "licenses.csv";
pub const CONVERSION_REFERENCES_FILE: &str = "conversion_factors.csv";

/// Load every source file under `dir`. All five files must exist.
pub fn read_record_set(dir: &Path) -> Result<RecordSet> {
    let records = RecordSet {
        transactions: load_csv(&dir.join(TRANSACTIONS_FILE))?,
        products: load_csv(&dir.join(PRODUCTS_FILE))?,
        warehouses: load_csv(&dir.join(WAREHOUSES_FILE))?,
        licenses: load_csv(&dir.join(LICENSES_FILE))?,
        conversion_references: load_csv(&dir.join(CONVERSION_REFERENCES_FILE))?,
    };

    info!(dir = %dir.display(), rows = records.len(), "source files loaded");
    Ok(records)
}

pub fn load_csv<T: DeserializeOwned>(csv_path: &Path) -> Result<Vec<T>> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;

    let mut rows = Vec::new();
    for (index, result) in rdr.deserialize().enumerate() {
        // +2: header line, 1-based
        let row: T = result.with_context(|| {
            format!("Failed to deserialize {} line {}", csv_path.display(), index + 2)
        })?;
        rows.push(row);
    }

    Ok(rows)
}
