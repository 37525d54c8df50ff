// 🏷️ Report flags - every catalog flag column holds exactly "Y" or "N"

use super::{Rule, RuleKind};
use crate::db::StoreResult;
use crate::error::Violation;
use crate::models::{ReportFlag, FLAG_NO, FLAG_YES};
use rusqlite::{params, Connection};

pub struct EnumFlagRule;

impl Rule for EnumFlagRule {
    fn kind(&self) -> RuleKind {
        RuleKind::EnumFlags
    }

    fn check(&self, session: &Connection) -> StoreResult<Vec<Violation>> {
        let mut violations = Vec::new();

        for flag in ReportFlag::ALL {
            // NULL fails too: a blank cell is not a decision
            let sql = format!(
                "SELECT ndc_no_dashes, {col} FROM products
                 WHERE {col} IS NULL OR {col} NOT IN (?1, ?2)
                 ORDER BY ndc_no_dashes",
                col = flag.column()
            );
            let mut stmt = session.prepare(&sql)?;
            let rows = stmt.query_map(params![FLAG_YES, FLAG_NO], |row| {
                Ok(Violation::InvalidFlag {
                    product_code: row.get(0)?,
                    flag,
                    value: row.get(1)?,
                })
            })?;

            for row in rows {
                violations.push(row?);
            }
        }

        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::test_support::{sample_record_set, test_conn};

    #[test]
    fn test_clean_catalog_passes() {
        let conn = test_conn();
        db::insert_products(&conn, &sample_record_set().products).unwrap();

        assert!(EnumFlagRule.check(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_reports_every_bad_cell() {
        let conn = test_conn();
        let mut products = sample_record_set().products;
        products[0].arcos_flag = Some("Yes".to_string());
        products[1].dscsa_flag = None;
        products[1].ny_state_flag = Some("y".to_string());
        db::insert_products(&conn, &products).unwrap();

        let violations = EnumFlagRule.check(&conn).unwrap();

        assert_eq!(violations.len(), 3);
        assert_eq!(
            violations[0],
            Violation::InvalidFlag {
                product_code: products[0].product_code.clone(),
                flag: ReportFlag::Arcos,
                value: Some("Yes".to_string()),
            }
        );
        assert!(violations.contains(&Violation::InvalidFlag {
            product_code: products[1].product_code.clone(),
            flag: ReportFlag::Dscsa,
            value: None,
        }));
        assert!(violations.contains(&Violation::InvalidFlag {
            product_code: products[1].product_code.clone(),
            flag: ReportFlag::NewYorkStateExciseTax,
            value: Some("y".to_string()),
        }));
    }
}
