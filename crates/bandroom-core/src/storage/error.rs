//! Storage error handling
//!
//! Provides typed errors for store operations with descriptive messages
//! and recovery suggestions.

use std::io;
use std::path::PathBuf;

use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to create the directory holding the store file
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The store stayed locked through every retry
    #[error("Store '{path}' is locked (gave up after {attempts} attempt(s)): {source}")]
    Locked {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: rusqlite::Error,
    },

    /// A uniqueness (or other) constraint rejected the write
    #[error("Constraint violation in '{path}': {source}")]
    ConstraintViolation {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Any other failure reported by SQLite
    #[error("Database error in '{path}': {source}")]
    Database {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The copy-aside repair of a locked store failed
    #[error("Failed to repair store '{path}': {source}")]
    Repair {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    /// Create an error from a SQLite error with path context
    ///
    /// Lock contention is classified separately by the executor, which knows
    /// how many attempts were made.
    pub fn from_sqlite(error: rusqlite::Error, path: PathBuf) -> Self {
        if is_constraint_error(&error) {
            StorageError::ConstraintViolation {
                path,
                source: error,
            }
        } else {
            StorageError::Database {
                path,
                source: error,
            }
        }
    }

    /// Check if the store was locked by another connection
    pub fn is_lock_contention(&self) -> bool {
        matches!(self, StorageError::Locked { .. })
    }

    /// Check if a constraint rejected the statement
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, StorageError::ConstraintViolation { .. })
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::Locked { .. } => {
                Some("Another process is using the store. Close it and try again, or raise max_attempts.")
            }
            StorageError::ConstraintViolation { .. } => {
                Some("A row with the same natural key already exists.")
            }
            StorageError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            StorageError::Repair { .. } => {
                Some("The store file may have been left aside; look for a '.repair' file next to it.")
            }
            StorageError::Database { .. } => None,
        }
    }
}

/// Check if a SQLite error means another connection holds the lock
///
/// Matches on the result code first and falls back to the message text.
pub fn is_lock_error(error: &rusqlite::Error) -> bool {
    match error {
        rusqlite::Error::SqliteFailure(err, msg) => {
            matches!(err.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
                || msg
                    .as_deref()
                    .map_or(false, |m| m.contains("database is locked"))
        }
        other => other.to_string().contains("database is locked"),
    }
}

fn is_constraint_error(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation
    )
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::ffi;

    fn sqlite_failure(code: i32, msg: &str) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(ffi::Error::new(code), Some(msg.to_string()))
    }

    #[test]
    fn test_busy_and_locked_are_lock_errors() {
        assert!(is_lock_error(&sqlite_failure(
            ffi::SQLITE_BUSY,
            "database is locked"
        )));
        assert!(is_lock_error(&sqlite_failure(
            ffi::SQLITE_LOCKED,
            "database table is locked"
        )));
    }

    #[test]
    fn test_lock_message_without_busy_code() {
        let err = sqlite_failure(ffi::SQLITE_ERROR, "database is locked");
        assert!(is_lock_error(&err));
    }

    #[test]
    fn test_other_errors_are_not_lock_errors() {
        assert!(!is_lock_error(&sqlite_failure(
            ffi::SQLITE_ERROR,
            "no such table: students"
        )));
        assert!(!is_lock_error(&rusqlite::Error::QueryReturnedNoRows));
    }

    #[test]
    fn test_constraint_classification() {
        let err = StorageError::from_sqlite(
            sqlite_failure(
                ffi::SQLITE_CONSTRAINT_UNIQUE,
                "UNIQUE constraint failed: instruments.serial_num",
            ),
            PathBuf::from("/data/inventory.db"),
        );

        assert!(err.is_constraint_violation());
        assert!(!err.is_lock_contention());
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_generic_database_classification() {
        let err = StorageError::from_sqlite(
            sqlite_failure(ffi::SQLITE_ERROR, "no such table: students"),
            PathBuf::from("/data/inventory.db"),
        );

        assert!(matches!(err, StorageError::Database { .. }));
        assert!(err.recovery_suggestion().is_none());
    }

    #[test]
    fn test_locked_display() {
        let err = StorageError::Locked {
            path: PathBuf::from("/data/inventory.db"),
            attempts: 3,
            source: sqlite_failure(ffi::SQLITE_BUSY, "database is locked"),
        };

        let msg = err.to_string();
        assert!(msg.contains("locked"));
        assert!(msg.contains("/data/inventory.db"));
        assert!(msg.contains("3 attempt"));
    }
}
