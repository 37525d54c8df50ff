// 🔗 Reference checks - every transaction points at a known warehouse and a
// known catalog entry

use super::{Rule, RuleKind};
use crate::db::StoreResult;
use crate::error::Violation;
use rusqlite::Connection;

/// Distinct values of the first column returned by an anti-join
fn dangling_ids(session: &Connection, sql: &str) -> StoreResult<Vec<String>> {
    let mut stmt = session.prepare(sql)?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

pub struct WarehouseReferenceRule;

impl Rule for WarehouseReferenceRule {
    fn kind(&self) -> RuleKind {
        RuleKind::WarehouseReferences
    }

    fn check(&self, session: &Connection) -> StoreResult<Vec<Violation>> {
        let ids = dangling_ids(
            session,
            "SELECT DISTINCT t.reporting_registrant_num
             FROM transactions t
             LEFT JOIN warehouses w ON w.dea_number = t.reporting_registrant_num
             WHERE w.dea_number IS NULL
             ORDER BY t.reporting_registrant_num",
        )?;

        Ok(ids
            .into_iter()
            .map(|registrant_id| Violation::UnknownWarehouse { registrant_id })
            .collect())
    }
}

pub struct ProductReferenceRule;

impl Rule for ProductReferenceRule {
    fn kind(&self) -> RuleKind {
        RuleKind::ProductReferences
    }

    fn check(&self, session: &Connection) -> StoreResult<Vec<Violation>> {
        let ids = dangling_ids(
            session,
            "SELECT DISTINCT t.ndc_num
             FROM transactions t
             LEFT JOIN products p ON p.ndc_no_dashes = t.ndc_num
             WHERE p.ndc_no_dashes IS NULL
             ORDER BY t.ndc_num",
        )?;

        Ok(ids
            .into_iter()
            .map(|product_code| Violation::UnknownProduct { product_code })
            .collect())
    }
}
