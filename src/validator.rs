// ✅ Validation Orchestrator - run the rule battery in order, stop at the
// first failing rule

use crate::config::ValidationConfig;
use crate::error::{RuleFailure, ValidationFailure};
use crate::progress::ProgressSink;
use crate::rules::{self, Rule, RuleKind};
use rusqlite::Transaction;
use tracing::{error, info, warn};

pub struct Validator {
    rules: Vec<Box<dyn Rule>>,
}

impl Validator {
    pub fn new(config: &ValidationConfig) -> Self {
        Validator {
            rules: rules::standard_rules(config),
        }
    }

    pub fn rule_kinds(&self) -> Vec<RuleKind> {
        self.rules.iter().map(|rule| rule.kind()).collect()
    }

    /// Check the record set visible through `session`.
    ///
    /// `session` is the caller's writer transaction: the conversion factor
    /// rule writes, and nothing here commits or rolls back. On failure the
    /// caller rolls back.
    pub fn validate(
        &self,
        session: &Transaction<'_>,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), ValidationFailure> {
        for rule in &self.rules {
            let stage = rule.kind().name();
            progress.report(stage, 0);

            let violations = rule.check(session).map_err(|err| {
                error!(rule = stage, error = %err, "rule aborted by an internal error");
                ValidationFailure::Internal(err)
            })?;

            if !violations.is_empty() {
                let failure = RuleFailure::new(rule.kind(), violations);
                warn!(
                    rule = stage,
                    category = %failure.category(),
                    violations = failure.violations().len(),
                    "{}",
                    failure.technical_message()
                );
                return Err(ValidationFailure::Rule(failure));
            }

            progress.report(stage, 100);
            info!(rule = stage, "rule passed");
        }

        info!("all validation rules passed");
        Ok(())
    }
}

impl Default for Validator {
    fn default() -> Self {
        Validator::new(&ValidationConfig::default())
    }
}
