// 🪪 Customer licenses - in-jurisdiction shipments of state-reported products
// need exactly one well-formed license covering the transaction date

use super::{is_fixed_length_digits, Rule, RuleKind};
use crate::db::{self, StoreResult};
use crate::error::{LicenseMatch, Violation};
use crate::models::{License, FLAG_YES};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::collections::{HashMap, HashSet};
use tracing::debug;

pub struct LicenseRule {
    jurisdiction: String,
    number_len: usize,
}

/// A transaction the license check applies to
struct LicensedShipment {
    transaction_id: String,
    customer_id: String,
    transaction_date: NaiveDate,
}

impl LicenseRule {
    pub fn new(jurisdiction: &str, number_len: usize) -> Self {
        LicenseRule {
            jurisdiction: jurisdiction.to_string(),
            number_len,
        }
    }

    fn shipments_in_scope(&self, session: &Connection) -> StoreResult<Vec<LicensedShipment>> {
        let mut stmt = session.prepare(
            "SELECT t.transaction_id, t.ship_to_customer, t.transaction_date
             FROM transactions t
             JOIN products p ON p.ndc_no_dashes = t.ndc_num
             WHERE p.include_in_ny_state_and_excise_tax_reports = ?1
               AND t.state = ?2
             ORDER BY t.id",
        )?;

        let rows = stmt
            .query_map(params![FLAG_YES, self.jurisdiction], |row| {
                Ok(LicensedShipment {
                    transaction_id: row.get(0)?,
                    customer_id: row.get(1)?,
                    transaction_date: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        // Line items of one transaction share id, customer and date
        let mut seen = HashSet::new();
        Ok(rows
            .into_iter()
            .filter(|s| {
                seen.insert((
                    s.transaction_id.clone(),
                    s.customer_id.clone(),
                    s.transaction_date,
                ))
            })
            .collect())
    }
}

impl Rule for LicenseRule {
    fn kind(&self) -> RuleKind {
        RuleKind::CustomerLicenses
    }

    fn check(&self, session: &Connection) -> StoreResult<Vec<Violation>> {
        let shipments = self.shipments_in_scope(session)?;
        if shipments.is_empty() {
            debug!(jurisdiction = %self.jurisdiction, "no shipments need a license");
            return Ok(Vec::new());
        }

        let licenses = db::get_licenses(session)?;

        // Date ranges are meaningless until every number is well formed
        let malformed: Vec<Violation> = licenses
            .iter()
            .filter(|l| !is_fixed_length_digits(&l.license_number, self.number_len))
            .map(|l| Violation::MalformedLicenseNumber {
                customer_id: l.customer_id.clone(),
                license_number: l.license_number.clone(),
                expected_len: self.number_len,
            })
            .collect();
        if !malformed.is_empty() {
            return Ok(malformed);
        }

        let mut by_customer: HashMap<&str, Vec<&License>> = HashMap::new();
        for license in &licenses {
            by_customer
                .entry(license.customer_id.as_str())
                .or_default()
                .push(license);
        }

        let mut missing = Vec::new();
        let mut ambiguous = Vec::new();

        for shipment in shipments {
            let covering: Vec<&License> = by_customer
                .get(shipment.customer_id.as_str())
                .map(|held| {
                    held.iter()
                        .copied()
                        .filter(|l| l.covers(shipment.transaction_date))
                        .collect()
                })
                .unwrap_or_default();

            match covering.len() {
                1 => {}
                0 => missing.push(Violation::MissingLicense {
                    transaction_id: shipment.transaction_id,
                    customer_id: shipment.customer_id,
                    transaction_date: shipment.transaction_date,
                }),
                _ => ambiguous.push(Violation::AmbiguousLicense {
                    transaction_id: shipment.transaction_id,
                    customer_id: shipment.customer_id,
                    transaction_date: shipment.transaction_date,
                    matches: covering
                        .iter()
                        .map(|l| LicenseMatch {
                            license_number: l.license_number.clone(),
                            valid_from: l.valid_from,
                            valid_to: l.valid_to,
                        })
                        .collect(),
                }),
            }
        }

        missing.extend(ambiguous);
        Ok(missing)
    }
}
