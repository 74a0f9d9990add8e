//! Storage layer
//!
//! Everything that talks to the SQLite store file.
//!
//! ## Architecture
//!
//! - **executor**: one connection and one transaction per call, with lock
//!   retry
//! - **schema**: table and unique index creation
//! - **repair**: opt-in copy-aside of a store file that stays locked
//! - **error**: typed errors shared by all of the above

pub mod error;
pub mod executor;
pub mod repair;
pub mod schema;

pub use error::{StorageError, StorageResult};
pub use executor::{is_select, RetryPolicy, Row, StatementExecutor};
pub use schema::{ensure_schema, needs_init};
