// 🔒 Transaction Manager - scoped unit of work over the Record Store
//
// One writer connection behind a lock. `with_transaction` is the only way to
// write: acquire -> run -> commit or rollback -> release, on every path.
// Readers get their own short-lived connections and never touch the lock.

use crate::db::{self, StoreResult};
use crate::error::StoreError;
use rusqlite::{Connection, ErrorCode, OpenFlags, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error};
use uuid::Uuid;

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where reader connections attach
#[derive(Debug, Clone)]
enum Location {
    Disk(PathBuf),
    /// URI of a shared-cache in-memory database; lives as long as the writer
    Memory(String),
}

/// The Record Store behind a single-writer lock
pub struct Store {
    writer: Mutex<Connection>,
    writer_active: AtomicBool,
    location: Location,
}

/// Raised for the lifetime of a writer transaction, lowered on drop (panics
/// included)
struct WriterFlag<'a>(&'a AtomicBool);

impl<'a> WriterFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        WriterFlag(flag)
    }
}

impl Drop for WriterFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Store {
    /// Open (or create) the on-disk store in WAL mode
    pub fn open(path: &Path, busy_timeout: Duration) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for crash recovery
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(busy_timeout)?;
        db::setup_database(&conn)?;

        debug!(path = %path.display(), "store opened");
        Ok(Store::with_writer(conn, Location::Disk(path.to_path_buf())))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let uri = format!("file:compliance-{}?mode=memory&cache=shared", Uuid::new_v4());
        let conn = Connection::open_with_flags(
            &uri,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        db::setup_database(&conn)?;
        Ok(Store::with_writer(conn, Location::Memory(uri)))
    }

    fn with_writer(conn: Connection, location: Location) -> Self {
        Store {
            writer: Mutex::new(conn),
            writer_active: AtomicBool::new(false),
            location,
        }
    }

    /// Run `work` inside one writer transaction.
    ///
    /// `Ok` commits; `Err` rolls back and hands the error back unchanged.
    /// A panic inside `work` drops the transaction, which rolls it back too.
    /// The connection is released before this returns, whatever happened.
    pub fn with_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T, E>,
        E: From<StoreError> + std::fmt::Display,
    {
        let mut conn = self.acquire();
        let flag = WriterFlag::raise(&self.writer_active);
        let result = Self::run_unit_of_work(&mut conn, work);
        drop(flag);
        drop(conn);
        debug!("connection released");
        result
    }

    fn run_unit_of_work<T, E, F>(conn: &mut Connection, work: F) -> Result<T, E>
    where
        F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T, E>,
        E: From<StoreError> + std::fmt::Display,
    {
        let unit = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        debug!("transaction started");

        match work(&unit) {
            Ok(value) => {
                unit.commit().map_err(StoreError::from)?;
                debug!("transaction committed");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = unit.rollback() {
                    error!(
                        error = %rollback_err,
                        "rollback failed; connection drop will discard the transaction"
                    );
                }
                error!(error = %err, "transaction rolled back");
                Err(err)
            }
        }
    }

    /// Read committed data without waiting on a writer.
    ///
    /// Each call runs on its own query-only connection, so any number of
    /// readers can work at once. Returns `StoreError::WriterActive` instead
    /// of blocking while a writer transaction is in flight.
    pub fn read<T, F>(&self, query: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        if self.writer_active.load(Ordering::Acquire) {
            return Err(StoreError::WriterActive);
        }

        let conn = self.open_reader().map_err(contention_as_writer_active)?;
        query(&conn).map_err(contention_as_writer_active)
    }

    fn open_reader(&self) -> StoreResult<Connection> {
        let conn = match &self.location {
            Location::Disk(path) => Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?,
            Location::Memory(uri) => Connection::open_with_flags(
                uri,
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?,
        };
        conn.pragma_update(None, "query_only", true)?;
        Ok(conn)
    }

    /// A poisoned lock still guards a usable connection: the transaction of
    /// the panicking holder was rolled back when it was dropped.
    fn acquire(&self) -> MutexGuard<'_, Connection> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A writer that started after the flag check shows up as a lock error
fn contention_as_writer_active(err: StoreError) -> StoreError {
    let contended = matches!(
        &err,
        StoreError::Sqlite(rusqlite::Error::SqliteFailure(failure, _))
            if matches!(failure.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    );
    if contended {
        StoreError::WriterActive
    } else {
        err
    }
}
