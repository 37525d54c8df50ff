// 💊 MME conversion factors - attach a factor to each catalog entry from the
// NDC MME Data, matched on 9-digit prefix plus exact strength
//
// The only rule that writes. Assignments live in the caller's transaction and
// vanish with it on rollback.

use super::{Rule, RuleKind};
use crate::db::{self, StoreResult};
use crate::error::Violation;
use crate::models::{ConversionReference, FLAG_YES};
use rusqlite::{params, Connection};
use std::collections::{HashMap, HashSet};
use tracing::debug;

pub struct ConversionFactorRule {
    prefix_len: usize,
}

impl ConversionFactorRule {
    pub fn new(prefix_len: usize) -> Self {
        ConversionFactorRule { prefix_len }
    }

    fn prefix<'a>(&self, product_code: &'a str) -> &'a str {
        match product_code.char_indices().nth(self.prefix_len) {
            Some((end, _)) => &product_code[..end],
            None => product_code,
        }
    }
}

impl Rule for ConversionFactorRule {
    fn kind(&self) -> RuleKind {
        RuleKind::ConversionFactors
    }

    fn check(&self, session: &Connection) -> StoreResult<Vec<Violation>> {
        // Factors from a previous cycle must not survive into this one
        db::clear_conversion_factors(session)?;

        let products = db::get_products(session)?;
        let references = db::get_conversion_references(session)?;

        let mut by_prefix: HashMap<&str, Vec<&ConversionReference>> = HashMap::new();
        for reference in &references {
            by_prefix
                .entry(reference.product_prefix.as_str())
                .or_default()
                .push(reference);
        }

        let mut missing = Vec::new();
        let mut duplicates = Vec::new();
        let mut reported = HashSet::new();
        let mut assigned = 0usize;

        for product in &products {
            let candidates: Vec<&ConversionReference> = by_prefix
                .get(self.prefix(&product.product_code))
                .map(|refs| {
                    refs.iter()
                        .copied()
                        .filter(|r| r.strength_mg == product.strength_mg)
                        .collect()
                })
                .unwrap_or_default();

            match candidates.as_slice() {
                [only] => {
                    let factor = only.conversion_factor;
                    db::set_conversion_factor(session, &product.product_code, factor)?;
                    assigned += 1;
                }
                // Entries outside the state reports may go without a factor
                _ if !product.requires_state_checks() => {}
                [] => {
                    reported.insert(product.product_code.clone());
                    missing.push(Violation::MissingConversionFactor {
                        product_code: product.product_code.clone(),
                        strength_mg: product.strength_mg,
                    });
                }
                many => {
                    reported.insert(product.product_code.clone());
                    duplicates.push(Violation::DuplicateConversionReference {
                        product_code: product.product_code.clone(),
                        strength_mg: product.strength_mg,
                        factors: many.iter().map(|r| r.conversion_factor).collect(),
                    });
                }
            }
        }

        debug!(assigned, "conversion factors assigned");

        let mut violations = missing;
        violations.extend(duplicates);
        violations.extend(unassigned_required(session, &reported)?);

        Ok(violations)
    }
}

/// Consistency check over what actually landed in the table: state-reported
/// entries still without a factor that matching did not already report.
///
/// Matching covers every entry it read, so this stays empty unless the rows
/// changed underneath it within the same session.
pub(crate) fn unassigned_required(
    session: &Connection,
    reported: &HashSet<String>,
) -> StoreResult<Vec<Violation>> {
    let mut stmt = session.prepare(
        "SELECT ndc_no_dashes FROM products
         WHERE include_in_ny_state_and_excise_tax_reports = ?1
           AND mme_conv_factor IS NULL
         ORDER BY ndc_no_dashes",
    )?;
    let unassigned = stmt
        .query_map(params![FLAG_YES], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(unassigned
        .into_iter()
        .filter(|code| !reported.contains(code))
        .map(|product_code| Violation::UnassignedConversionFactor { product_code })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::models::RecordSet;
    use crate::test_support::{create_test_product, sample_record_set, test_conn};

    fn run(records: &RecordSet) -> (Vec<Violation>, Vec<Option<f64>>) {
        let conn = test_conn();
        db::replace_record_set(&conn, records).unwrap();
        let violations = ConversionFactorRule::new(9).check(&conn).unwrap();
        let factors = db::get_products(&conn)
            .unwrap()
            .into_iter()
            .map(|p| p.conversion_factor)
            .collect();
        (violations, factors)
    }

    #[test]
    fn test_prefix_truncation() {
        let rule = ConversionFactorRule::new(9);
        assert_eq!(rule.prefix("00406012301"), "004060123");
        assert_eq!(rule.prefix("0040601"), "0040601");
    }

    #[test]
    fn test_every_entry_gets_its_factor() {
        let (violations, factors) = run(&sample_record_set());

        assert!(violations.is_empty());
        assert_eq!(factors, vec![Some(1.5), Some(1.0), Some(1.0)]);
    }

    #[test]
    fn test_strength_must_match_exactly() {
        let mut records = sample_record_set();
        records.products[0].strength_mg = 7.5;

        let (violations, factors) = run(&records);

        assert_eq!(
            violations,
            vec![Violation::MissingConversionFactor {
                product_code: records.products[0].product_code.clone(),
                strength_mg: 7.5,
            }]
        );
        assert_eq!(factors[0], None);
        // Others were still assigned inside the session
        assert_eq!(factors[1], Some(1.0));
    }

    #[test]
    fn test_duplicate_reference_is_reported() {
        let mut records = sample_record_set();
        let mut twin = records.conversion_references[1].clone();
        twin.conversion_factor = 1.2;
        records.conversion_references.push(twin);

        let (violations, factors) = run(&records);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].category(), ErrorCategory::ConversionFactorDuplicate);
        assert_eq!(violations[0].offending_id(), records.products[1].product_code);
        assert_eq!(factors[1], None);
    }

    #[test]
    fn test_entries_outside_state_reports_may_lack_factor() {
        let mut records = sample_record_set();
        records.products[2].ny_state_flag = Some("N".to_string());
        records.conversion_references.pop();

        let (violations, factors) = run(&records);

        assert!(violations.is_empty());
        assert_eq!(factors[2], None);
    }

    #[test]
    fn test_entries_outside_state_reports_still_get_unique_match() {
        let mut records = sample_record_set();
        records.products[2].ny_state_flag = Some("N".to_string());

        let (violations, factors) = run(&records);

        assert!(violations.is_empty());
        assert_eq!(factors[2], Some(1.0));
    }

    #[test]
    fn test_stale_factor_cleared_before_matching() {
        let mut records = sample_record_set();
        records.products[0].conversion_factor = Some(9.9);
        records.products[0].strength_mg = 7.5;

        let (violations, factors) = run(&records);

        assert_eq!(violations.len(), 1);
        assert_eq!(factors[0], None);
    }

    #[test]
    fn test_duplicates_outside_state_reports_stay_silent() {
        let mut records = sample_record_set();
        records.products[1].ny_state_flag = Some("N".to_string());
        let mut twin = records.conversion_references[1].clone();
        twin.conversion_factor = 1.2;
        records.conversion_references.push(twin);

        let (violations, factors) = run(&records);

        assert!(violations.is_empty());
        assert_eq!(factors, vec![Some(1.5), None, Some(1.0)]);
    }

    #[test]
    fn test_entry_added_after_matching_is_unassigned() {
        let conn = test_conn();
        db::replace_record_set(&conn, &sample_record_set()).unwrap();
        let rule = ConversionFactorRule::new(9);
        assert!(rule.check(&conn).unwrap().is_empty());

        let late = create_test_product("11111222233", 20.0);
        db::insert_products(&conn, &[late]).unwrap();

        assert_eq!(
            unassigned_required(&conn, &HashSet::new()).unwrap(),
            vec![Violation::UnassignedConversionFactor {
                product_code: "11111222233".to_string(),
            }]
        );
    }

    #[test]
    fn test_reported_entries_are_not_repeated_as_unassigned() {
        let mut records = sample_record_set();
        records.products[0].strength_mg = 7.5;
        let conn = test_conn();
        db::replace_record_set(&conn, &records).unwrap();
        let violations = ConversionFactorRule::new(9).check(&conn).unwrap();
        assert_eq!(violations.len(), 1);

        let code = records.products[0].product_code.clone();
        let reported: HashSet<String> = [code.clone()].into();
        assert!(unassigned_required(&conn, &reported).unwrap().is_empty());
        assert_eq!(
            unassigned_required(&conn, &HashSet::new()).unwrap(),
            vec![Violation::UnassignedConversionFactor { product_code: code }]
        );
    }
}
