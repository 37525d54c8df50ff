// 💊 Record Store entities - one import cycle's worth of tabular data
//
// Column names follow the source workbooks so the CSV hand-off can be
// deserialized directly with serde.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// REPORT FLAGS
// ============================================================================

/// Regulatory inclusion flags carried by every catalog entry.
///
/// Valid values are exactly `"Y"` or `"N"`; anything else is an enum-domain
/// violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReportFlag {
    Arcos,
    Dscsa,
    MichiganState,
    NewYorkStateExciseTax,
}

impl ReportFlag {
    pub const ALL: [ReportFlag; 4] = [
        ReportFlag::Arcos,
        ReportFlag::Dscsa,
        ReportFlag::MichiganState,
        ReportFlag::NewYorkStateExciseTax,
    ];

    /// Column name in the `products` table
    pub fn column(&self) -> &'static str {
        match self {
            ReportFlag::Arcos => "include_in_arcos_reports",
            ReportFlag::Dscsa => "include_in_dscsa_reports",
            ReportFlag::MichiganState => "include_in_mi_state_reports",
            ReportFlag::NewYorkStateExciseTax => "include_in_ny_state_and_excise_tax_reports",
        }
    }

    /// Label shown to users instead of the column name
    pub fn label(&self) -> &'static str {
        match self {
            ReportFlag::Arcos => "For ARCOS Reports",
            ReportFlag::Dscsa => "For DSCSA Reports",
            ReportFlag::MichiganState => "For Michigan State Reports",
            ReportFlag::NewYorkStateExciseTax => "For New York State and Excise Tax Reports",
        }
    }
}

pub const FLAG_YES: &str = "Y";
pub const FLAG_NO: &str = "N";

// ============================================================================
// TABLES
// ============================================================================

/// Store tables, with the names users know them by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Table {
    Transactions,
    Products,
    Warehouses,
    Licenses,
    ConversionReferences,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Transactions,
        Table::Products,
        Table::Warehouses,
        Table::Licenses,
        Table::ConversionReferences,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Transactions => "transactions",
            Table::Products => "products",
            Table::Warehouses => "warehouses",
            Table::Licenses => "licenses",
            Table::ConversionReferences => "conversion_references",
        }
    }

    pub fn friendly_name(&self) -> &'static str {
        match self {
            Table::Transactions => "Transaction Data",
            Table::Products => "Controlled Substance Master",
            Table::Warehouses => "Warehouse Data",
            Table::Licenses => "Customer License Data",
            Table::ConversionReferences => "NDC MME Data",
        }
    }
}

// ============================================================================
// ENTITIES
// ============================================================================

/// One controlled-substance shipment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,

    /// Warehouse registrant (DEA) number
    #[serde(rename = "reporting_registrant_num")]
    pub registrant_id: String,

    /// 11-digit NDC without dashes
    #[serde(rename = "ndc_num")]
    pub product_code: String,

    #[serde(rename = "ship_to_customer")]
    pub customer_id: String,

    /// Jurisdiction the shipment went to (drives the license check)
    #[serde(rename = "state")]
    pub ship_to_state: String,

    pub transaction_date: NaiveDate,

    pub quantity: f64,

    #[serde(default)]
    pub strength: String,
}

/// Controlled substance master (catalog) entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "ndc_no_dashes")]
    pub product_code: String,

    #[serde(rename = "include_in_arcos_reports", default)]
    pub arcos_flag: Option<String>,

    #[serde(rename = "include_in_dscsa_reports", default)]
    pub dscsa_flag: Option<String>,

    #[serde(rename = "include_in_mi_state_reports", default)]
    pub mi_state_flag: Option<String>,

    #[serde(rename = "include_in_ny_state_and_excise_tax_reports", default)]
    pub ny_state_flag: Option<String>,

    /// Strength in milligrams
    #[serde(rename = "cs_strength_mg")]
    pub strength_mg: f64,

    /// Resolved by the conversion-factor rule; never read from source files
    #[serde(skip_deserializing, default)]
    pub conversion_factor: Option<f64>,
}

impl Product {
    /// Entries flagged for state/excise-tax reporting need a license and an MME factor
    pub fn requires_state_checks(&self) -> bool {
        self.ny_state_flag.as_deref() == Some(FLAG_YES)
    }
}

/// The corporate-identity tuple a tax identifier must map to one-to-one
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CorporateIdentity {
    pub name: String,
    pub address: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
}

impl std::fmt::Display for CorporateIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}, {}",
            self.name, self.address, self.city, self.region, self.postal_code
        )
    }
}

/// Distribution center
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warehouse {
    #[serde(rename = "dea_number")]
    pub registrant_id: String,

    #[serde(rename = "tin_number")]
    pub tax_id: String,

    pub corporate_name: String,

    pub corporate_address: String,

    pub corporate_city: String,

    #[serde(rename = "corporate_state")]
    pub corporate_region: String,

    #[serde(rename = "corporate_zip")]
    pub corporate_postal_code: String,
}

impl Warehouse {
    pub fn corporate_identity(&self) -> CorporateIdentity {
        CorporateIdentity {
            name: self.corporate_name.clone(),
            address: self.corporate_address.clone(),
            city: self.corporate_city.clone(),
            region: self.corporate_region.clone(),
            postal_code: self.corporate_postal_code.clone(),
        }
    }
}

/// Strip dashes from a tax identifier ("12-3456789" -> "123456789")
pub fn normalize_tax_id(raw: &str) -> String {
    raw.chars().filter(|c| *c != '-').collect()
}

/// Customer state controlled-substance license
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    #[serde(rename = "customer")]
    pub customer_id: String,

    pub license_number: String,

    pub valid_from: NaiveDate,

    pub valid_to: NaiveDate,
}

impl License {
    /// Inclusive on both ends
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.valid_from <= date && date <= self.valid_to
    }
}

/// MME conversion factor reference row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionReference {
    #[serde(rename = "nine_digit_ndc")]
    pub product_prefix: String,

    #[serde(rename = "strength_per_unit")]
    pub strength_mg: f64,

    #[serde(rename = "mme_conversion_factor")]
    pub conversion_factor: f64,
}

// ============================================================================
// RECORD SET
// ============================================================================

/// Everything one import cycle hands to the Record Store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    pub transactions: Vec<Transaction>,
    pub products: Vec<Product>,
    pub warehouses: Vec<Warehouse>,
    pub licenses: Vec<License>,
    pub conversion_references: Vec<ConversionReference>,
}

impl RecordSet {
    pub fn len(&self) -> usize {
        self.transactions.len()
            + self.products.len()
            + self.warehouses.len()
            + self.licenses.len()
            + self.conversion_references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_license_covers_inclusive_range() {
        let license = License {
            customer_id: "C1".to_string(),
            license_number: "1234567".to_string(),
            valid_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            valid_to: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
        };

        assert!(license.covers(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        assert!(license.covers(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()));
        assert!(license.covers(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()));
        assert!(!license.covers(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()));
    }

    #[test]
    fn test_normalize_tax_id() {
        assert_eq!(normalize_tax_id("12-3456789"), "123456789");
        assert_eq!(normalize_tax_id("123456789"), "123456789");
    }

    #[test]
    fn test_report_flag_labels_are_distinct() {
        let labels: std::collections::HashSet<_> =
            ReportFlag::ALL.iter().map(|f| f.label()).collect();
        assert_eq!(labels.len(), ReportFlag::ALL.len());
    }
}
