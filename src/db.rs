use crate::error::StoreError;
use crate::models::{
    normalize_tax_id, ConversionReference, License, Product, RecordSet, Table, Transaction,
    Warehouse,
};
use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::debug;

pub type StoreResult<T> = Result<T, StoreError>;

/// Row counts per table, reported after a cycle and by `status`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub transactions: usize,
    pub products: usize,
    pub warehouses: usize,
    pub licenses: usize,
    pub conversion_references: usize,
}

impl TableCounts {
    pub fn total(&self) -> usize {
        self.transactions
            + self.products
            + self.warehouses
            + self.licenses
            + self.conversion_references
    }
}

pub fn setup_database(conn: &Connection) -> StoreResult<()> {
    // ==========================================================================
    // Transaction Data
    // No FOREIGN KEY clauses: references are checked by the rule set so the
    // error text stays under our control.
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transaction_id TEXT NOT NULL,
            reporting_registrant_num TEXT NOT NULL,
            ndc_num TEXT NOT NULL,
            ship_to_customer TEXT NOT NULL,
            state TEXT NOT NULL,
            transaction_date TEXT NOT NULL,
            quantity REAL NOT NULL,
            strength TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Controlled Substance Master (flags stay TEXT so bad values survive the
    // load and can be reported)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS products (
            ndc_no_dashes TEXT PRIMARY KEY NOT NULL,
            include_in_arcos_reports TEXT,
            include_in_dscsa_reports TEXT,
            include_in_mi_state_reports TEXT,
            include_in_ny_state_and_excise_tax_reports TEXT,
            cs_strength_mg REAL NOT NULL,
            mme_conv_factor REAL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Warehouse Data
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS warehouses (
            dea_number TEXT PRIMARY KEY NOT NULL,
            tin_number TEXT NOT NULL,
            corporate_name TEXT NOT NULL,
            corporate_address TEXT NOT NULL,
            corporate_city TEXT NOT NULL,
            corporate_state TEXT NOT NULL,
            corporate_zip TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Customer License Data
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS licenses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            customer TEXT NOT NULL,
            license_number TEXT NOT NULL,
            valid_from TEXT NOT NULL,
            valid_to TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // NDC MME Data (no key on the prefix: duplicates must be reportable)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS conversion_references (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nine_digit_ndc TEXT NOT NULL,
            strength_per_unit REAL NOT NULL,
            mme_conversion_factor REAL NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tx_registrant ON transactions(reporting_registrant_num)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tx_ndc ON transactions(ndc_num)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tx_customer ON transactions(ship_to_customer)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_license_customer ON licenses(customer)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_mme_ndc ON conversion_references(nine_digit_ndc)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// WRITES
// ============================================================================

/// Replace the contents of every table with `records`.
///
/// Meant to run inside a writer transaction; on rollback the previous
/// contents come back untouched.
pub fn replace_record_set(conn: &Connection, records: &RecordSet) -> StoreResult<TableCounts> {
    clear_all(conn)?;

    let counts = TableCounts {
        transactions: insert_transactions(conn, &records.transactions)?,
        products: insert_products(conn, &records.products)?,
        warehouses: insert_warehouses(conn, &records.warehouses)?,
        licenses: insert_licenses(conn, &records.licenses)?,
        conversion_references: insert_conversion_references(conn, &records.conversion_references)?,
    };

    debug!(rows = counts.total(), "record set replaced");
    Ok(counts)
}

pub fn clear_all(conn: &Connection) -> StoreResult<()> {
    for table in Table::ALL {
        conn.execute(&format!("DELETE FROM {}", table.name()), [])?;
    }
    Ok(())
}

pub fn insert_transactions(conn: &Connection, transactions: &[Transaction]) -> StoreResult<usize> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO transactions (
            transaction_id, reporting_registrant_num, ndc_num, ship_to_customer,
            state, transaction_date, quantity, strength
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;

    for tx in transactions {
        stmt.execute(params![
            tx.transaction_id,
            tx.registrant_id,
            tx.product_code,
            tx.customer_id,
            tx.ship_to_state,
            tx.transaction_date,
            tx.quantity,
            tx.strength,
        ])?;
    }

    Ok(transactions.len())
}

pub fn insert_products(conn: &Connection, products: &[Product]) -> StoreResult<usize> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO products (
            ndc_no_dashes, include_in_arcos_reports, include_in_dscsa_reports,
            include_in_mi_state_reports, include_in_ny_state_and_excise_tax_reports,
            cs_strength_mg, mme_conv_factor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;

    for product in products {
        stmt.execute(params![
            product.product_code,
            product.arcos_flag,
            product.dscsa_flag,
            product.mi_state_flag,
            product.ny_state_flag,
            product.strength_mg,
            product.conversion_factor,
        ])?;
    }

    Ok(products.len())
}

/// Tax ids are stored without dashes
pub fn insert_warehouses(conn: &Connection, warehouses: &[Warehouse]) -> StoreResult<usize> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO warehouses (
            dea_number, tin_number, corporate_name, corporate_address,
            corporate_city, corporate_state, corporate_zip
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;

    for warehouse in warehouses {
        stmt.execute(params![
            warehouse.registrant_id,
            normalize_tax_id(&warehouse.tax_id),
            warehouse.corporate_name,
            warehouse.corporate_address,
            warehouse.corporate_city,
            warehouse.corporate_region,
            warehouse.corporate_postal_code,
        ])?;
    }

    Ok(warehouses.len())
}

pub fn insert_licenses(conn: &Connection, licenses: &[License]) -> StoreResult<usize> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO licenses (customer, license_number, valid_from, valid_to)
         VALUES (?1, ?2, ?3, ?4)",
    )?;

    for license in licenses {
        stmt.execute(params![
            license.customer_id,
            license.license_number,
            license.valid_from,
            license.valid_to,
        ])?;
    }

    Ok(licenses.len())
}

pub fn insert_conversion_references(
    conn: &Connection,
    references: &[ConversionReference],
) -> StoreResult<usize> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO conversion_references (
            nine_digit_ndc, strength_per_unit, mme_conversion_factor
        ) VALUES (?1, ?2, ?3)",
    )?;

    for reference in references {
        stmt.execute(params![
            reference.product_prefix,
            reference.strength_mg,
            reference.conversion_factor,
        ])?;
    }

    Ok(references.len())
}

pub fn set_conversion_factor(
    conn: &Connection,
    product_code: &str,
    factor: f64,
) -> StoreResult<()> {
    conn.execute(
        "UPDATE products SET mme_conv_factor = ?1 WHERE ndc_no_dashes = ?2",
        params![factor, product_code],
    )?;
    Ok(())
}

pub fn clear_conversion_factors(conn: &Connection) -> StoreResult<usize> {
    let cleared = conn.execute(
        "UPDATE products SET mme_conv_factor = NULL WHERE mme_conv_factor IS NOT NULL",
        [],
    )?;
    Ok(cleared)
}

// ============================================================================
// READS
// ============================================================================

pub fn get_transactions(conn: &Connection) -> StoreResult<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT transaction_id, reporting_registrant_num, ndc_num, ship_to_customer,
                state, transaction_date, quantity, strength
         FROM transactions
         ORDER BY id",
    )?;

    let transactions = stmt
        .query_map([], |row| {
            let strength: Option<String> = row.get(7)?;
            Ok(Transaction {
                transaction_id: row.get(0)?,
                registrant_id: row.get(1)?,
                product_code: row.get(2)?,
                customer_id: row.get(3)?,
                ship_to_state: row.get(4)?,
                transaction_date: row.get(5)?,
                quantity: row.get(6)?,
                strength: strength.unwrap_or_default(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(transactions)
}

pub fn get_products(conn: &Connection) -> StoreResult<Vec<Product>> {
    let mut stmt = conn.prepare(
        "SELECT ndc_no_dashes, include_in_arcos_reports, include_in_dscsa_reports,
                include_in_mi_state_reports, include_in_ny_state_and_excise_tax_reports,
                cs_strength_mg, mme_conv_factor
         FROM products
         ORDER BY ndc_no_dashes",
    )?;

    let products = stmt
        .query_map([], |row| {
            Ok(Product {
                product_code: row.get(0)?,
                arcos_flag: row.get(1)?,
                dscsa_flag: row.get(2)?,
                mi_state_flag: row.get(3)?,
                ny_state_flag: row.get(4)?,
                strength_mg: row.get(5)?,
                conversion_factor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(products)
}

pub fn get_warehouses(conn: &Connection) -> StoreResult<Vec<Warehouse>> {
    let mut stmt = conn.prepare(
        "SELECT dea_number, tin_number, corporate_name, corporate_address,
                corporate_city, corporate_state, corporate_zip
         FROM warehouses
         ORDER BY dea_number",
    )?;

    let warehouses = stmt
        .query_map([], |row| {
            Ok(Warehouse {
                registrant_id: row.get(0)?,
                tax_id: row.get(1)?,
                corporate_name: row.get(2)?,
                corporate_address: row.get(3)?,
                corporate_city: row.get(4)?,
                corporate_region: row.get(5)?,
                corporate_postal_code: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(warehouses)
}

pub fn get_licenses(conn: &Connection) -> StoreResult<Vec<License>> {
    let mut stmt = conn.prepare(
        "SELECT customer, license_number, valid_from, valid_to
         FROM licenses
         ORDER BY id",
    )?;

    let licenses = stmt
        .query_map([], |row| {
            Ok(License {
                customer_id: row.get(0)?,
                license_number: row.get(1)?,
                valid_from: row.get(2)?,
                valid_to: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(licenses)
}

pub fn get_conversion_references(conn: &Connection) -> StoreResult<Vec<ConversionReference>> {
    let mut stmt = conn.prepare(
        "SELECT nine_digit_ndc, strength_per_unit, mme_conversion_factor
         FROM conversion_references
         ORDER BY id",
    )?;

    let references = stmt
        .query_map([], |row| {
            Ok(ConversionReference {
                product_prefix: row.get(0)?,
                strength_mg: row.get(1)?,
                conversion_factor: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(references)
}

/// Everything currently in the store
pub fn load_record_set(conn: &Connection) -> StoreResult<RecordSet> {
    Ok(RecordSet {
        transactions: get_transactions(conn)?,
        products: get_products(conn)?,
        warehouses: get_warehouses(conn)?,
        licenses: get_licenses(conn)?,
        conversion_references: get_conversion_references(conn)?,
    })
}

pub fn count_rows(conn: &Connection, table: Table) -> StoreResult<usize> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", table.name()),
        [],
        |row| row.get(0),
    )?;

    usize::try_from(count).map_err(|e| StoreError::CorruptValue {
        table: table.name(),
        column: "COUNT(*)",
        detail: e.to_string(),
    })
}

/// Catalog entries that currently carry an MME conversion factor
pub fn count_assigned_factors(conn: &Connection) -> StoreResult<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM products WHERE mme_conv_factor IS NOT NULL",
        [],
        |row| row.get(0),
    )?;

    usize::try_from(count).map_err(|e| StoreError::CorruptValue {
        table: Table::Products.name(),
        column: "mme_conv_factor",
        detail: e.to_string(),
    })
}

pub fn table_counts(conn: &Connection) -> StoreResult<TableCounts> {
    Ok(TableCounts {
        transactions: count_rows(conn, Table::Transactions)?,
        products: count_rows(conn, Table::Products)?,
        warehouses: count_rows(conn, Table::Warehouses)?,
        licenses: count_rows(conn, Table::Licenses)?,
        conversion_references: count_rows(conn, Table::ConversionReferences)?,
    })
}
