// Shared fixtures for unit tests

use crate::db;
use crate::models::{ConversionReference, License, Product, RecordSet, Transaction, Warehouse};
use chrono::NaiveDate;
use rusqlite::Connection;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// In-memory connection with the schema applied
pub fn test_conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::setup_database(&conn).unwrap();
    conn
}

pub fn create_test_transaction(
    id: &str,
    registrant: &str,
    ndc: &str,
    customer: &str,
    on: NaiveDate,
) -> Transaction {
    Transaction {
        transaction_id: id.to_string(),
        registrant_id: registrant.to_string(),
        product_code: ndc.to_string(),
        customer_id: customer.to_string(),
        ship_to_state: "NY".to_string(),
        transaction_date: on,
        quantity: 100.0,
        strength: String::new(),
    }
}

pub fn create_test_product(ndc: &str, strength_mg: f64) -> Product {
    Product {
        product_code: ndc.to_string(),
        arcos_flag: Some("Y".to_string()),
        dscsa_flag: Some("Y".to_string()),
        mi_state_flag: Some("N".to_string()),
        ny_state_flag: Some("Y".to_string()),
        strength_mg,
        conversion_factor: None,
    }
}

pub fn create_test_warehouse(dea: &str) -> Warehouse {
    Warehouse {
        registrant_id: dea.to_string(),
        tax_id: "123456789".to_string(),
        corporate_name: "Acme Pharma Distribution LLC".to_string(),
        corporate_address: "100 Main St".to_string(),
        corporate_city: "Albany".to_string(),
        corporate_region: "NY".to_string(),
        corporate_postal_code: "12207".to_string(),
    }
}

pub fn create_test_license(
    customer: &str,
    number: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> License {
    License {
        customer_id: customer.to_string(),
        license_number: number.to_string(),
        valid_from: from,
        valid_to: to,
    }
}

pub fn create_test_reference(prefix: &str, strength_mg: f64, factor: f64) -> ConversionReference {
    ConversionReference {
        product_prefix: prefix.to_string(),
        strength_mg,
        conversion_factor: factor,
    }
}

/// A record set that passes every rule.
///
/// Products and warehouses are listed in key order so that a store round
/// trip gives back an equal value.
pub fn sample_record_set() -> RecordSet {
    RecordSet {
        transactions: vec![
            create_test_transaction("T1001", "RA0123456", "00406012301", "C1", date(2025, 1, 15)),
            create_test_transaction("T1002", "RB0654321", "00591038501", "C1", date(2025, 2, 3)),
            create_test_transaction("T1003", "RA0123456", "42858000101", "C2", date(2025, 3, 10)),
        ],
        products: vec![
            create_test_product("00406012301", 5.0),
            create_test_product("00591038501", 10.0),
            create_test_product("42858000101", 15.0),
        ],
        warehouses: vec![
            create_test_warehouse("RA0123456"),
            create_test_warehouse("RB0654321"),
        ],
        licenses: vec![
            create_test_license("C1", "1234567", date(2024, 1, 1), date(2025, 12, 31)),
            create_test_license("C2", "7654321", date(2025, 1, 1), date(2025, 12, 31)),
        ],
        conversion_references: vec![
            create_test_reference("004060123", 5.0, 1.5),
            create_test_reference("005910385", 10.0, 1.0),
            create_test_reference("428580001", 15.0, 1.0),
        ],
    }
}
