//! Bandroom Core Library
//!
//! This crate provides the storage layer for Bandroom, a music-school
//! inventory tracker: students, instruments, and which instrument is out
//! with which student.
//!
//! # Architecture
//!
//! - **SQLite**: a single store file, possibly shared by several processes
//!
//! No connection is held between calls and nothing is cached in memory.
//!
//! # Quick Start
//!
//! ```text
//! let store = InventoryStore::open_with_config(Config::load()?)?;
//!
//! let mut student = Student::new("Logan", "Reid", "04/19/1998");
//! student.notes = "needs to practice more".into();
//! store.upsert_student(&student)?;
//!
//! let students = store.students()?;
//! ```
//!
//! # Modules
//!
//! - `store`: the store handle (main entry point)
//! - `models`: students, instruments, assignments, and table names
//! - `storage`: statement executor, schema, and storage errors
//! - `config`: Application configuration

pub mod config;
pub mod models;
pub mod storage;
pub mod store;

pub use config::Config;
pub use models::{Assignment, Instrument, Record, Student, StudentKey, Table};
pub use storage::{RetryPolicy, Row, StatementExecutor, StorageError, StorageResult};
pub use store::{InventoryStore, UpsertOutcome};

/// Column value type used in raw rows
pub use rusqlite::types::Value;
