// Pharma Compliance - Core Library
// Validation and transaction engine for controlled-substance distribution data

pub mod config;
pub mod cycle;
pub mod db;
pub mod error;
pub mod loader;
pub mod models;
pub mod progress;
pub mod rules;
pub mod store;
pub mod validator;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use config::{AppConfig, ValidationConfig};
pub use cycle::{run_import_cycle, run_validation_cycle, CycleReport};
pub use db::{load_record_set, table_counts, StoreResult, TableCounts};
pub use error::{
    ErrorCategory, FailureReport, LicenseMatch, RuleFailure, StoreError, ValidationFailure,
    Violation, INTERNAL_USER_MESSAGE,
};
pub use loader::read_record_set;
pub use models::{
    ConversionReference, CorporateIdentity, License, Product, RecordSet, ReportFlag, Table,
    Transaction, Warehouse,
};
pub use progress::{NoProgress, ProgressSink, RecordedProgress, TracingProgress};
pub use rules::{Rule, RuleKind};
pub use store::{Store, DEFAULT_BUSY_TIMEOUT};
pub use validator::Validator;
