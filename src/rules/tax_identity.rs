// 🏢 Tax identity - warehouse TINs are 9 digits and map one-to-one onto
// corporate identities (name, address, city, state, zip)

use super::{is_fixed_length_digits, Rule, RuleKind};
use crate::db::{self, StoreResult};
use crate::error::Violation;
use crate::models::CorporateIdentity;
use rusqlite::Connection;
use std::collections::{BTreeMap, BTreeSet};

pub struct TaxIdentityRule {
    tax_id_len: usize,
}

impl TaxIdentityRule {
    pub fn new(tax_id_len: usize) -> Self {
        TaxIdentityRule { tax_id_len }
    }
}

impl Rule for TaxIdentityRule {
    fn kind(&self) -> RuleKind {
        RuleKind::TaxIdentity
    }

    /// Warehouses are stored with dashes already stripped from the TIN, so
    /// this rule only reads.
    fn check(&self, session: &Connection) -> StoreResult<Vec<Violation>> {
        let warehouses = db::get_warehouses(session)?;

        let malformed: Vec<Violation> = warehouses
            .iter()
            .filter(|w| !is_fixed_length_digits(&w.tax_id, self.tax_id_len))
            .map(|w| Violation::MalformedTaxId {
                registrant_id: w.registrant_id.clone(),
                tax_id: w.tax_id.clone(),
                expected_len: self.tax_id_len,
            })
            .collect();
        if !malformed.is_empty() {
            return Ok(malformed);
        }

        let mut identities_by_tax_id: BTreeMap<&str, BTreeSet<CorporateIdentity>> = BTreeMap::new();
        let mut tax_ids_by_identity: BTreeMap<CorporateIdentity, BTreeSet<&str>> = BTreeMap::new();

        for warehouse in &warehouses {
            let identity = warehouse.corporate_identity();
            identities_by_tax_id
                .entry(warehouse.tax_id.as_str())
                .or_default()
                .insert(identity.clone());
            tax_ids_by_identity
                .entry(identity)
                .or_default()
                .insert(warehouse.tax_id.as_str());
        }

        let mut violations: Vec<Violation> = identities_by_tax_id
            .into_iter()
            .filter(|(_, identities)| identities.len() > 1)
            .map(|(tax_id, identities)| Violation::TaxIdWithMultipleIdentities {
                tax_id: tax_id.to_string(),
                identities: identities.into_iter().collect(),
            })
            .collect();

        violations.extend(
            tax_ids_by_identity
                .into_iter()
                .filter(|(_, tax_ids)| tax_ids.len() > 1)
                .map(|(identity, tax_ids)| Violation::IdentityWithMultipleTaxIds {
                    identity,
                    tax_ids: tax_ids.into_iter().map(str::to_string).collect(),
                }),
        );

        Ok(violations)
    }
}
