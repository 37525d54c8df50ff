// 📋 Rule Set - independent checks over the in-flight record set
//
// Each rule reports every offender it finds, not just the first one. The
// orchestrator decides what to do with them.

use crate::config::ValidationConfig;
use crate::db::StoreResult;
use crate::error::Violation;
use rusqlite::Connection;
use serde::Serialize;

mod conversion_factors;
mod enum_flags;
mod licenses;
mod references;
mod tax_identity;

pub use conversion_factors::ConversionFactorRule;
pub use enum_flags::EnumFlagRule;
pub use licenses::LicenseRule;
pub use references::{ProductReferenceRule, WarehouseReferenceRule};
pub use tax_identity::TaxIdentityRule;

// ============================================================================
// RULE KINDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    EnumFlags,
    WarehouseReferences,
    ProductReferences,
    CustomerLicenses,
    TaxIdentity,
    ConversionFactors,
}

impl RuleKind {
    /// Execution order: cheapest and most likely to fail first
    pub const ORDERED: [RuleKind; 6] = [
        RuleKind::EnumFlags,
        RuleKind::WarehouseReferences,
        RuleKind::ProductReferences,
        RuleKind::CustomerLicenses,
        RuleKind::TaxIdentity,
        RuleKind::ConversionFactors,
    ];

    /// Stage name used in progress events and logs
    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::EnumFlags => "enum_flags",
            RuleKind::WarehouseReferences => "warehouse_references",
            RuleKind::ProductReferences => "product_references",
            RuleKind::CustomerLicenses => "customer_licenses",
            RuleKind::TaxIdentity => "tax_identity",
            RuleKind::ConversionFactors => "conversion_factors",
        }
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// RULE
// ============================================================================

pub trait Rule {
    fn kind(&self) -> RuleKind;

    /// Empty vector means the rule passed. `Err` is reserved for store
    /// failures, never for data problems.
    fn check(&self, session: &Connection) -> StoreResult<Vec<Violation>>;
}

/// The fixed battery, in `RuleKind::ORDERED` order
pub fn standard_rules(config: &ValidationConfig) -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(EnumFlagRule),
        Box::new(WarehouseReferenceRule),
        Box::new(ProductReferenceRule),
        Box::new(LicenseRule::new(
            &config.license_jurisdiction,
            config.license_number_len,
        )),
        Box::new(TaxIdentityRule::new(config.tax_id_len)),
        Box::new(ConversionFactorRule::new(config.reference_prefix_len)),
    ]
}

/// `len` characters, every one an ASCII digit
pub(crate) fn is_fixed_length_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_rules_follow_declared_order() {
        let kinds: Vec<RuleKind> = standard_rules(&ValidationConfig::default())
            .iter()
            .map(|rule| rule.kind())
            .collect();

        assert_eq!(kinds, RuleKind::ORDERED.to_vec());
    }

    #[test]
    fn test_fixed_length_digits() {
        assert!(is_fixed_length_digits("1234567", 7));
        assert!(!is_fixed_length_digits("123456", 7));
        assert!(!is_fixed_length_digits("12345678", 7));
        assert!(!is_fixed_length_digits("12345A7", 7));
    }
}
