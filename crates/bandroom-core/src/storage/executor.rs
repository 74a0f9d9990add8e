//! Statement executor
//!
//! Every call opens its own connection, runs inside one transaction, commits,
//! and closes the connection before returning. Nothing is cached between
//! calls, so several processes can share one store file.
//!
//! ## Retry policy
//!
//! Lock contention (`SQLITE_BUSY` / `SQLITE_LOCKED`, "database is locked")
//! re-runs the whole call on a fresh connection with exponential backoff.
//! Any other error is returned on the first failure. When the last attempt
//! is still locked and `repair_on_lock` is set, the store file is copied
//! aside and back (see [`super::repair`]) before the error is returned.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Rows, Transaction, TransactionBehavior};
use tracing::{debug, error, warn};

use super::error::{is_lock_error, StorageError, StorageResult};
use super::repair::repair_store_file;
use crate::config::Config;

/// One result row, in column order
pub type Row = Vec<Value>;

/// Retry settings for lock contention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each later retry
    pub backoff: Duration,
    /// SQLite busy handler timeout per connection
    pub busy_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(100),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff.saturating_mul(1 << exponent)
    }
}

/// Runs single statements against the store file
#[derive(Debug, Clone)]
pub struct StatementExecutor {
    path: PathBuf,
    verbose: bool,
    retry: RetryPolicy,
    repair_on_lock: bool,
}

impl StatementExecutor {
    /// Create an executor for the store file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            verbose: false,
            retry: RetryPolicy::default(),
            repair_on_lock: false,
        }
    }

    /// Create an executor from application configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.db_path())
            .with_verbose(config.verbose)
            .with_retry_policy(config.retry_policy())
            .with_repair_on_lock(config.repair_on_lock)
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_repair_on_lock(mut self, repair: bool) -> Self {
        self.repair_on_lock = repair;
        self
    }

    /// Path of the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a fresh connection with the configured busy timeout
    pub fn open_connection(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.retry.busy_timeout)?;
        Ok(conn)
    }

    /// Execute one statement with bound parameters
    ///
    /// Returns `Some(rows)` for statements starting with `SELECT`
    /// (case-insensitive, leading whitespace ignored), `None` otherwise. Rows
    /// produced by any other statement are stepped through and dropped.
    pub fn execute(&self, sql: &str, params: &[Value]) -> StorageResult<Option<Vec<Row>>> {
        if self.verbose {
            debug!(statement = sql, ?params, "execute");
        }

        let returns_rows = is_select(sql);
        let behavior = if returns_rows {
            TransactionBehavior::Deferred
        } else {
            TransactionBehavior::Immediate
        };

        let result = self.run("execute", behavior, |tx| {
            let mut stmt = tx.prepare(sql)?;
            if returns_rows {
                let columns = stmt.column_count();
                let rows = stmt
                    .query_map(params_from_iter(params.iter()), |row| {
                        (0..columns)
                            .map(|i| row.get::<_, Value>(i))
                            .collect::<rusqlite::Result<Row>>()
                    })?
                    .collect::<rusqlite::Result<Vec<Row>>>()?;
                Ok(Some(rows))
            } else {
                drain(stmt.query(params_from_iter(params.iter()))?)?;
                Ok(None)
            }
        })?;

        debug!(rows = ?result.as_ref().map(Vec::len), "execute result");
        Ok(result)
    }

    /// Execute one statement once per parameter tuple, in a single transaction
    pub fn execute_many(&self, sql: &str, batch: &[Vec<Value>]) -> StorageResult<()> {
        if self.verbose {
            debug!(statement = sql, ?batch, "execute_many");
        }

        self.run("execute_many", TransactionBehavior::Immediate, |tx| {
            let mut stmt = tx.prepare(sql)?;
            for params in batch {
                drain(stmt.query(params_from_iter(params.iter()))?)?;
            }
            Ok(())
        })?;

        debug!(statements = batch.len(), "execute_many result");
        Ok(())
    }

    /// Run a closure against one connection inside one IMMEDIATE transaction
    ///
    /// The closure may run more than once if the store is locked, so it must
    /// not have side effects outside the transaction.
    pub fn with_transaction<T, F>(&self, op: &str, f: F) -> StorageResult<T>
    where
        F: FnMut(&Transaction<'_>) -> rusqlite::Result<T>,
    {
        if self.verbose {
            debug!(op, "with_transaction");
        }
        self.run(op, TransactionBehavior::Immediate, f)
    }

    fn run<T, F>(&self, op: &str, behavior: TransactionBehavior, mut f: F) -> StorageResult<T>
    where
        F: FnMut(&Transaction<'_>) -> rusqlite::Result<T>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match self.attempt(behavior, &mut f) {
                Ok(value) => {
                    debug!(op, attempt, "committed");
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !is_lock_error(&err) {
                error!(op, path = ?self.path, error = %err, "statement failed");
                return Err(StorageError::from_sqlite(err, self.path.clone()));
            }

            if attempt < self.retry.max_attempts {
                let delay = self.retry.delay_after(attempt);
                warn!(
                    op,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "store locked, retrying"
                );
                thread::sleep(delay);
                continue;
            }

            error!(op, attempts = attempt, path = ?self.path, error = %err, "store locked, giving up");
            if self.repair_on_lock {
                // Not safe if another process is mid-write; opt-in only.
                match repair_store_file(&self.path) {
                    Ok(()) => warn!(path = ?self.path, "store file copied aside and restored"),
                    Err(repair_err) => error!(error = %repair_err, "store repair failed"),
                }
            }
            return Err(StorageError::Locked {
                path: self.path.clone(),
                attempts: attempt,
                source: err,
            });
        }
    }

    fn attempt<T, F>(&self, behavior: TransactionBehavior, f: &mut F) -> rusqlite::Result<T>
    where
        F: FnMut(&Transaction<'_>) -> rusqlite::Result<T>,
    {
        let mut conn = self.open_connection()?;
        let tx = conn.transaction_with_behavior(behavior)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

/// Step a statement to completion, discarding any rows it produces
///
/// `PRAGMA`, `WITH ...`, `VALUES` and `... RETURNING` statements yield rows
/// even though they are not treated as reads.
fn drain(mut rows: Rows<'_>) -> rusqlite::Result<()> {
    while rows.next()?.is_some() {}
    Ok(())
}

/// Check if a statement reads rows (starts with `SELECT`)
pub fn is_select(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .map_or(false, |head| head.eq_ignore_ascii_case("select"))
}
