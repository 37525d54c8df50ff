// 🔄 Cycles - one unit of work each: import + validate, or re-validate what is
// already stored. Either everything commits or the store is left untouched.

use crate::db::{self, TableCounts};
use crate::error::ValidationFailure;
use crate::models::RecordSet;
use crate::progress::ProgressSink;
use crate::store::Store;
use crate::validator::Validator;
use serde::Serialize;
use tracing::{info, info_span, warn};
use uuid::Uuid;

/// Summary of a committed cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub counts: TableCounts,
    pub factors_assigned: usize,
}

/// Replace the stored record set with `records` and validate it.
///
/// Commits only if every rule passes. On failure the previous contents are
/// still in place and the failure is returned unchanged.
pub fn run_import_cycle(
    store: &Store,
    records: &RecordSet,
    validator: &Validator,
    progress: &mut dyn ProgressSink,
) -> Result<CycleReport, ValidationFailure> {
    let cycle_id = Uuid::new_v4();
    let span = info_span!("import_cycle", %cycle_id);
    let _enter = span.enter();

    info!(records = records.len(), "import cycle started");

    let outcome = store.with_transaction::<_, ValidationFailure, _>(|session| {
        let counts = db::replace_record_set(session, records)?;
        validator.validate(session, progress)?;
        let factors_assigned = db::count_assigned_factors(session)?;
        Ok(CycleReport {
            cycle_id,
            counts,
            factors_assigned,
        })
    });

    log_outcome(&outcome);
    outcome
}

/// Re-run the rule battery over the stored record set.
///
/// Refreshes conversion factors on success.
pub fn run_validation_cycle(
    store: &Store,
    validator: &Validator,
    progress: &mut dyn ProgressSink,
) -> Result<CycleReport, ValidationFailure> {
    let cycle_id = Uuid::new_v4();
    let span = info_span!("validation_cycle", %cycle_id);
    let _enter = span.enter();

    info!("validation cycle started");

    let outcome = store.with_transaction::<_, ValidationFailure, _>(|session| {
        validator.validate(session, progress)?;
        Ok(CycleReport {
            cycle_id,
            counts: db::table_counts(session)?,
            factors_assigned: db::count_assigned_factors(session)?,
        })
    });

    log_outcome(&outcome);
    outcome
}

fn log_outcome(outcome: &Result<CycleReport, ValidationFailure>) {
    match outcome {
        Ok(report) => info!(
            rows = report.counts.total(),
            factors_assigned = report.factors_assigned,
            "cycle committed"
        ),
        Err(failure) => warn!(
            category = %failure.category(),
            rule = failure.rule().map(|r| r.name()).unwrap_or("none"),
            "cycle rejected; store left unchanged"
        ),
    }
}
