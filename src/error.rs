// 🚨 Error Taxonomy - violations, rule failures and the catch-all
//
// Every named violation carries the offending identifiers plus two renderings:
// a technical one for logs and a user-facing one that says which records are
// wrong and what data entry fixes them.

use crate::models::{CorporateIdentity, ReportFlag, Table};
use crate::rules::RuleKind;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;

/// Shown for anything no named rule anticipated
pub const INTERNAL_USER_MESSAGE: &str = "An unexpected error occurred while validating the \
imported data. No changes were saved. Please try again or contact support.";

const RERUN_INSTRUCTION: &str =
    "After correcting the source data, run the import again. \
     No changes from this import were saved.";

// ============================================================================
// CATEGORIES
// ============================================================================

/// Discriminant callers can branch on without parsing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    EnumDomain,
    DanglingWarehouse,
    DanglingProduct,
    LicenseFormat,
    LicenseMissing,
    LicenseAmbiguous,
    TaxIdFormat,
    TaxIdentity,
    ConversionFactorMissing,
    ConversionFactorDuplicate,
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::EnumDomain => "enum_domain",
            ErrorCategory::DanglingWarehouse => "dangling_warehouse",
            ErrorCategory::DanglingProduct => "dangling_product",
            ErrorCategory::LicenseFormat => "license_format",
            ErrorCategory::LicenseMissing => "license_missing",
            ErrorCategory::LicenseAmbiguous => "license_ambiguous",
            ErrorCategory::TaxIdFormat => "tax_id_format",
            ErrorCategory::TaxIdentity => "tax_identity",
            ErrorCategory::ConversionFactorMissing => "conversion_factor_missing",
            ErrorCategory::ConversionFactorDuplicate => "conversion_factor_duplicate",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// VIOLATIONS
// ============================================================================

/// A license whose range contains a transaction date
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseMatch {
    pub license_number: String,
    pub valid_from: NaiveDate,
    pub valid_to: NaiveDate,
}

/// One offending record (or group of records) found by a rule
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    InvalidFlag {
        product_code: String,
        flag: ReportFlag,
        value: Option<String>,
    },
    UnknownWarehouse {
        registrant_id: String,
    },
    UnknownProduct {
        product_code: String,
    },
    MalformedLicenseNumber {
        customer_id: String,
        license_number: String,
        expected_len: usize,
    },
    MissingLicense {
        transaction_id: String,
        customer_id: String,
        transaction_date: NaiveDate,
    },
    AmbiguousLicense {
        transaction_id: String,
        customer_id: String,
        transaction_date: NaiveDate,
        matches: Vec<LicenseMatch>,
    },
    MalformedTaxId {
        registrant_id: String,
        tax_id: String,
        expected_len: usize,
    },
    TaxIdWithMultipleIdentities {
        tax_id: String,
        identities: Vec<CorporateIdentity>,
    },
    IdentityWithMultipleTaxIds {
        identity: CorporateIdentity,
        tax_ids: Vec<String>,
    },
    MissingConversionFactor {
        product_code: String,
        strength_mg: f64,
    },
    DuplicateConversionReference {
        product_code: String,
        strength_mg: f64,
        factors: Vec<f64>,
    },
    /// Final-pass finding: required entry left without a factor
    UnassignedConversionFactor {
        product_code: String,
    },
}

impl Violation {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Violation::InvalidFlag { .. } => ErrorCategory::EnumDomain,
            Violation::UnknownWarehouse { .. } => ErrorCategory::DanglingWarehouse,
            Violation::UnknownProduct { .. } => ErrorCategory::DanglingProduct,
            Violation::MalformedLicenseNumber { .. } => ErrorCategory::LicenseFormat,
            Violation::MissingLicense { .. } => ErrorCategory::LicenseMissing,
            Violation::AmbiguousLicense { .. } => ErrorCategory::LicenseAmbiguous,
            Violation::MalformedTaxId { .. } => ErrorCategory::TaxIdFormat,
            Violation::TaxIdWithMultipleIdentities { .. }
            | Violation::IdentityWithMultipleTaxIds { .. } => ErrorCategory::TaxIdentity,
            Violation::MissingConversionFactor { .. }
            | Violation::UnassignedConversionFactor { .. } => {
                ErrorCategory::ConversionFactorMissing
            }
            Violation::DuplicateConversionReference { .. } => {
                ErrorCategory::ConversionFactorDuplicate
            }
        }
    }

    /// Table the user has to edit
    pub fn table(&self) -> Table {
        match self {
            Violation::InvalidFlag { .. } | Violation::UnknownProduct { .. } => Table::Products,
            Violation::UnknownWarehouse { .. }
            | Violation::MalformedTaxId { .. }
            | Violation::TaxIdWithMultipleIdentities { .. }
            | Violation::IdentityWithMultipleTaxIds { .. } => Table::Warehouses,
            Violation::MalformedLicenseNumber { .. }
            | Violation::MissingLicense { .. }
            | Violation::AmbiguousLicense { .. } => Table::Licenses,
            Violation::MissingConversionFactor { .. }
            | Violation::DuplicateConversionReference { .. }
            | Violation::UnassignedConversionFactor { .. } => Table::ConversionReferences,
        }
    }

    /// Business identifier of the offending entity
    pub fn offending_id(&self) -> String {
        match self {
            Violation::InvalidFlag { product_code, .. }
            | Violation::UnknownProduct { product_code }
            | Violation::MissingConversionFactor { product_code, .. }
            | Violation::DuplicateConversionReference { product_code, .. }
            | Violation::UnassignedConversionFactor { product_code } => product_code.clone(),
            Violation::UnknownWarehouse { registrant_id } => registrant_id.clone(),
            Violation::MalformedLicenseNumber { license_number, .. } => license_number.clone(),
            Violation::MissingLicense { transaction_id, .. }
            | Violation::AmbiguousLicense { transaction_id, .. } => transaction_id.clone(),
            Violation::MalformedTaxId { tax_id, .. }
            | Violation::TaxIdWithMultipleIdentities { tax_id, .. } => tax_id.clone(),
            Violation::IdentityWithMultipleTaxIds { identity, .. } => identity.to_string(),
        }
    }

    /// One line for logs
    pub fn describe(&self) -> String {
        match self {
            Violation::InvalidFlag { product_code, flag, value } => format!(
                "products.{} = {:?} for NDC {}",
                flag.column(),
                value,
                product_code
            ),
            Violation::UnknownWarehouse { registrant_id } => {
                format!("transactions.reporting_registrant_num {} has no warehouse", registrant_id)
            }
            Violation::UnknownProduct { product_code } => {
                format!("transactions.ndc_num {} has no catalog entry", product_code)
            }
            Violation::MalformedLicenseNumber {
                customer_id,
                license_number,
                expected_len,
            } => format!(
                "license {:?} of customer {} is not {} digits",
                license_number, customer_id, expected_len
            ),
            Violation::MissingLicense { transaction_id, customer_id, transaction_date } => format!(
                "no license for transaction {} (customer {}, {})",
                transaction_id, customer_id, transaction_date
            ),
            Violation::AmbiguousLicense {
                transaction_id,
                customer_id,
                transaction_date,
                matches,
            } => format!(
                "{} licenses for transaction {} (customer {}, {}): {}",
                matches.len(),
                transaction_id,
                customer_id,
                transaction_date,
                license_list(matches)
            ),
            Violation::MalformedTaxId {
                registrant_id,
                tax_id,
                expected_len,
            } => format!(
                "warehouse {} has TIN {:?}, expected {} digits",
                registrant_id, tax_id, expected_len
            ),
            Violation::TaxIdWithMultipleIdentities { tax_id, identities } => format!(
                "TIN {} maps to {} corporate identities",
                tax_id,
                identities.len()
            ),
            Violation::IdentityWithMultipleTaxIds { identity, tax_ids } => format!(
                "corporate identity [{}] maps to TINs {}",
                identity,
                tax_ids.join(", ")
            ),
            Violation::MissingConversionFactor { product_code, strength_mg } => format!(
                "no MME reference for NDC {} at strength {}",
                product_code, strength_mg
            ),
            Violation::DuplicateConversionReference {
                product_code,
                strength_mg,
                factors,
            } => format!(
                "{} MME references for NDC {} at strength {}: {:?}",
                factors.len(),
                product_code,
                strength_mg,
                factors
            ),
            Violation::UnassignedConversionFactor { product_code } => {
                format!("NDC {} still has no MME conversion factor", product_code)
            }
        }
    }
}

fn license_list(matches: &[LicenseMatch]) -> String {
    matches
        .iter()
        .map(|m| format!("{} ({} to {})", m.license_number, m.valid_from, m.valid_to))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// RULE FAILURE
// ============================================================================

/// The complete violation set reported by the first failing rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleFailure {
    rule: RuleKind,
    violations: Vec<Violation>,
}

impl RuleFailure {
    pub fn new(rule: RuleKind, violations: Vec<Violation>) -> Self {
        RuleFailure { rule, violations }
    }

    pub fn rule(&self) -> RuleKind {
        self.rule
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Category of the first violation; rules order violations by severity
    pub fn category(&self) -> ErrorCategory {
        self.violations
            .first()
            .map(Violation::category)
            .unwrap_or(ErrorCategory::Internal)
    }

    /// Distinct categories present, in order of first appearance
    pub fn categories(&self) -> Vec<ErrorCategory> {
        let mut seen = Vec::new();
        for violation in &self.violations {
            let category = violation.category();
            if !seen.contains(&category) {
                seen.push(category);
            }
        }
        seen
    }

    /// Distinct offending identifiers, in order of first appearance
    pub fn offending_ids(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for violation in &self.violations {
            let id = violation.offending_id();
            if !seen.contains(&id) {
                seen.push(id);
            }
        }
        seen
    }

    pub fn technical_message(&self) -> String {
        format!(
            "{} failed with {} violation(s): {}",
            self.rule.name(),
            self.violations.len(),
            self.violations
                .iter()
                .map(Violation::describe)
                .collect::<Vec<_>>()
                .join("; ")
        )
    }

    pub fn user_message(&self) -> String {
        let mut sections: Vec<String> = self
            .categories()
            .into_iter()
            .map(|category| self.section_for(category))
            .collect();
        sections.push(RERUN_INSTRUCTION.to_string());
        sections.join("\n\n")
    }

    fn of_category(&self, category: ErrorCategory) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(move |v| v.category() == category)
    }

    fn section_for(&self, category: ErrorCategory) -> String {
        let table = self
            .of_category(category)
            .next()
            .map(Violation::table)
            .unwrap_or(Table::Transactions)
            .friendly_name();

        match category {
            ErrorCategory::EnumDomain => {
                let mut codes = BTreeSet::new();
                let mut labels = BTreeSet::new();
                for violation in self.of_category(category) {
                    if let Violation::InvalidFlag { product_code, flag, .. } = violation {
                        codes.insert(product_code.as_str());
                        labels.insert(flag.label());
                    }
                }
                format!(
                    "Invalid values were found in the {} for the following NDCs:\n\n{}\n\n\
                     Please make sure these columns contain a 'Y' or 'N' value:\n\n{}",
                    table,
                    join(codes),
                    join(labels)
                )
            }
            ErrorCategory::DanglingWarehouse => format!(
                "Unrecognized DEA numbers for distribution warehouses were found in the \
                 Transaction Data. If these numbers belong to valid warehouses, add them to the \
                 {} with their TIN and corporate details:\n\n{}",
                table,
                self.ids_of(category).join(", ")
            ),
            ErrorCategory::DanglingProduct => format!(
                "Unrecognized products (NDCs) were found in the Transaction Data. If these are \
                 valid controlled substance products, add them to the {} with their report flags \
                 and strength:\n\n{}",
                table,
                self.ids_of(category).join(", ")
            ),
            ErrorCategory::LicenseFormat => format!(
                "All state CS license numbers must be exactly {} digits. Correct the following \
                 license numbers in the {}:\n\n{}",
                self.expected_len_of(category),
                table,
                self.lines_of(category, |v| match v {
                    Violation::MalformedLicenseNumber {
                        customer_id,
                        license_number,
                        ..
                    } => {
                        format!("Customer {}: {}", customer_id, license_number)
                    }
                    other => other.describe(),
                })
            ),
            ErrorCategory::LicenseMissing => format!(
                "No valid customer license covers the following transactions. Add or extend the \
                 customer's license in the {} so that its valid-from / valid-to range includes \
                 the transaction date:\n\n{}",
                table,
                self.lines_of(category, |v| match v {
                    Violation::MissingLicense { transaction_id, customer_id, transaction_date } => {
                        format!(
                            "Transaction {}, customer {}, date {}",
                            transaction_id, customer_id, transaction_date
                        )
                    }
                    other => other.describe(),
                })
            ),
            ErrorCategory::LicenseAmbiguous => format!(
                "More than one customer license is valid on the date of the following \
                 transactions. Adjust the license date ranges in the {} so that exactly one \
                 license covers each date:\n\n{}",
                table,
                self.lines_of(category, |v| match v {
                    Violation::AmbiguousLicense {
                        transaction_id,
                        customer_id,
                        transaction_date,
                        matches,
                    } => format!(
                        "Transaction {}, customer {}, date {}: licenses {}",
                        transaction_id,
                        customer_id,
                        transaction_date,
                        license_list(matches)
                    ),
                    other => other.describe(),
                })
            ),
            ErrorCategory::TaxIdFormat => format!(
                "Tax identification numbers (TINs) in the {} must be exactly {} digits. Correct \
                 the TIN for the following warehouses:\n\n{}",
                table,
                self.expected_len_of(category),
                self.lines_of(category, |v| match v {
                    Violation::MalformedTaxId {
                        registrant_id,
                        tax_id,
                        ..
                    } => {
                        format!("DEA# {}: TIN {}", registrant_id, tax_id)
                    }
                    other => other.describe(),
                })
            ),
            ErrorCategory::TaxIdentity => format!(
                "Each TIN in the {} must belong to exactly one set of corporate details, and each \
                 set of corporate details to exactly one TIN. Make the following rows \
                 consistent:\n\n{}",
                table,
                self.lines_of(category, |v| match v {
                    Violation::TaxIdWithMultipleIdentities { tax_id, identities } => format!(
                        "TIN# {} is associated with multiple corporate information sets:\n{}",
                        tax_id,
                        identities
                            .iter()
                            .map(|i| format!("   - {}", i))
                            .collect::<Vec<_>>()
                            .join("\n")
                    ),
                    Violation::IdentityWithMultipleTaxIds { identity, tax_ids } => format!(
                        "Corporate info {} is associated with multiple TINs:\n{}",
                        identity,
                        tax_ids
                            .iter()
                            .map(|t| format!("   - {}", t))
                            .collect::<Vec<_>>()
                            .join("\n")
                    ),
                    other => other.describe(),
                })
            ),
            ErrorCategory::ConversionFactorMissing => format!(
                "An MME conversion factor is required for every New York opioid product, and no \
                 match on 9-digit NDC and strength was found in the {} for the following \
                 products. Add a row with the 9-digit NDC, strength and conversion factor, or \
                 correct the strength in the Controlled Substance Master:\n\n{}",
                table,
                self.lines_of(category, |v| match v {
                    Violation::MissingConversionFactor { product_code, strength_mg } => {
                        format!("NDC: {}, Strength: {}", product_code, strength_mg)
                    }
                    Violation::UnassignedConversionFactor { product_code } => {
                        format!("NDC: {}", product_code)
                    }
                    other => other.describe(),
                })
            ),
            ErrorCategory::ConversionFactorDuplicate => format!(
                "The {} contains more than one row for the same 9-digit NDC and strength. Remove \
                 the duplicates so that a single conversion factor remains:\n\n{}",
                table,
                self.lines_of(category, |v| match v {
                    Violation::DuplicateConversionReference {
                        product_code,
                        strength_mg,
                        factors,
                    } => format!(
                        "NDC: {}, Strength: {} (factors: {})",
                        product_code,
                        strength_mg,
                        factors
                            .iter()
                            .map(|f| f.to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                    other => other.describe(),
                })
            ),
            ErrorCategory::Internal => INTERNAL_USER_MESSAGE.to_string(),
        }
    }

    /// Required length carried by the first format violation of `category`
    fn expected_len_of(&self, category: ErrorCategory) -> usize {
        self.of_category(category)
            .find_map(|v| match v {
                Violation::MalformedLicenseNumber { expected_len, .. }
                | Violation::MalformedTaxId { expected_len, .. } => Some(*expected_len),
                _ => None,
            })
            .unwrap_or_default()
    }

    fn ids_of(&self, category: ErrorCategory) -> Vec<String> {
        let mut ids: Vec<String> =
            self.of_category(category).map(Violation::offending_id).collect();
        ids.dedup();
        ids
    }

    fn lines_of(&self, category: ErrorCategory, render: impl Fn(&Violation) -> String) -> String {
        self.of_category(category)
            .map(render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn join(items: BTreeSet<&str>) -> String {
    items.into_iter().collect::<Vec<_>>().join(", ")
}

// ============================================================================
// STORE + VALIDATION ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("a writer transaction is active; committed data becomes readable once it finishes")]
    WriterActive,

    #[error("corrupt value in {table}.{column}: {detail}")]
    CorruptValue {
        table: &'static str,
        column: &'static str,
        detail: String,
    },
}

/// Outcome of `validate` when the cycle must be abandoned
#[derive(Debug, Error)]
pub enum ValidationFailure {
    #[error("{}", .0.technical_message())]
    Rule(RuleFailure),

    #[error("unexpected internal error: {0}")]
    Internal(#[from] StoreError),
}

impl From<rusqlite::Error> for ValidationFailure {
    fn from(err: rusqlite::Error) -> Self {
        ValidationFailure::Internal(StoreError::Sqlite(err))
    }
}

impl ValidationFailure {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ValidationFailure::Rule(failure) => failure.category(),
            ValidationFailure::Internal(_) => ErrorCategory::Internal,
        }
    }

    pub fn rule(&self) -> Option<RuleKind> {
        match self {
            ValidationFailure::Rule(failure) => Some(failure.rule()),
            ValidationFailure::Internal(_) => None,
        }
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            ValidationFailure::Rule(failure) => failure.violations(),
            ValidationFailure::Internal(_) => &[],
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, ValidationFailure::Internal(_))
    }

    pub fn technical_message(&self) -> String {
        self.to_string()
    }

    /// Never carries synthesized guidance for the catch-all
    pub fn user_message(&self) -> String {
        match self {
            ValidationFailure::Rule(failure) => failure.user_message(),
            ValidationFailure::Internal(_) => INTERNAL_USER_MESSAGE.to_string(),
        }
    }

    /// Structured detail for collaborators (UI, JSON output)
    pub fn report(&self) -> FailureReport {
        FailureReport {
            category: self.category(),
            rule: self.rule(),
            offending_ids: match self {
                ValidationFailure::Rule(failure) => failure.offending_ids(),
                ValidationFailure::Internal(_) => Vec::new(),
            },
            violations: self.violations().to_vec(),
            user_message: self.user_message(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub category: ErrorCategory,
    pub rule: Option<RuleKind>,
    pub offending_ids: Vec<String>,
    pub violations: Vec<Violation>,
    pub user_message: String,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_enum_message_lists_codes_and_labels() {
        let failure = RuleFailure::new(
            RuleKind::EnumFlags,
            vec![
                Violation::InvalidFlag {
                    product_code: "12345678901".to_string(),
                    flag: ReportFlag::Arcos,
                    value: Some("Yes".to_string()),
                },
                Violation::InvalidFlag {
                    product_code: "12345678901".to_string(),
                    flag: ReportFlag::Dscsa,
                    value: None,
                },
            ],
        );

        let message = failure.user_message();

        assert_eq!(failure.category(), ErrorCategory::EnumDomain);
        assert!(message.contains("12345678901"));
        assert!(message.contains("For ARCOS Reports"));
        assert!(message.contains("For DSCSA Reports"));
        assert!(!message.contains("include_in_arcos_reports"));
        assert_eq!(failure.offending_ids(), vec!["12345678901".to_string()]);
    }

    #[test]
    fn test_dangling_product_message_names_remedy() {
        let failure = RuleFailure::new(
            RuleKind::ProductReferences,
            vec![Violation::UnknownProduct {
                product_code: "99999999999".to_string(),
            }],
        );

        let message = failure.user_message();

        assert!(message.contains("99999999999"));
        assert!(message.contains("Controlled Substance Master"));
        assert!(message.contains("report flags"));
        assert!(message.contains("run the import again"));
    }

    #[test]
    fn test_ambiguous_license_message_names_both_licenses() {
        let failure = RuleFailure::new(
            RuleKind::CustomerLicenses,
            vec![Violation::AmbiguousLicense {
                transaction_id: "T1".to_string(),
                customer_id: "C1".to_string(),
                transaction_date: date(2025, 1, 15),
                matches: vec![
                    LicenseMatch {
                        license_number: "1111111".to_string(),
                        valid_from: date(2024, 1, 1),
                        valid_to: date(2025, 12, 31),
                    },
                    LicenseMatch {
                        license_number: "2222222".to_string(),
                        valid_from: date(2025, 1, 1),
                        valid_to: date(2026, 12, 31),
                    },
                ],
            }],
        );

        let message = failure.user_message();

        assert_eq!(failure.category(), ErrorCategory::LicenseAmbiguous);
        assert!(message.contains("1111111"));
        assert!(message.contains("2222222"));
        assert!(message.contains("Transaction T1"));
    }

    #[test]
    fn test_mixed_categories_keep_first_as_primary() {
        let failure = RuleFailure::new(
            RuleKind::CustomerLicenses,
            vec![
                Violation::MissingLicense {
                    transaction_id: "T1".to_string(),
                    customer_id: "C1".to_string(),
                    transaction_date: date(2025, 1, 15),
                },
                Violation::AmbiguousLicense {
                    transaction_id: "T2".to_string(),
                    customer_id: "C2".to_string(),
                    transaction_date: date(2025, 1, 16),
                    matches: Vec::new(),
                },
            ],
        );

        assert_eq!(failure.category(), ErrorCategory::LicenseMissing);
        assert_eq!(
            failure.categories(),
            vec![ErrorCategory::LicenseMissing, ErrorCategory::LicenseAmbiguous]
        );
        assert_eq!(failure.offending_ids(), vec!["T1".to_string(), "T2".to_string()]);
    }

    #[test]
    fn test_format_messages_use_configured_length() {
        let license = RuleFailure::new(
            RuleKind::CustomerLicenses,
            vec![Violation::MalformedLicenseNumber {
                customer_id: "C1".to_string(),
                license_number: "12345".to_string(),
                expected_len: 8,
            }],
        );
        let tax = RuleFailure::new(
            RuleKind::TaxIdentity,
            vec![Violation::MalformedTaxId {
                registrant_id: "RA0123456".to_string(),
                tax_id: "1234".to_string(),
                expected_len: 10,
            }],
        );

        assert!(license.user_message().contains("exactly 8 digits"));
        assert!(license.technical_message().contains("not 8 digits"));
        assert!(tax.user_message().contains("exactly 10 digits"));
        assert!(tax.technical_message().contains("expected 10 digits"));
        assert!(!license.user_message().contains("7 digits"));
    }

    #[test]
    fn test_internal_failure_hides_technical_detail() {
        let failure = ValidationFailure::Internal(StoreError::CorruptValue {
            table: "products",
            column: "cs_strength_mg",
            detail: "not a number".to_string(),
        });

        assert!(failure.is_internal());
        assert_eq!(failure.category(), ErrorCategory::Internal);
        assert_eq!(failure.user_message(), INTERNAL_USER_MESSAGE);
        assert!(failure.technical_message().contains("cs_strength_mg"));
        assert!(failure.report().offending_ids.is_empty());
    }
}
