//! Inventory store
//!
//! `InventoryStore` is the handle callers construct once and pass around.
//! Opening it creates the store file and schema if needed; every operation
//! afterwards goes through the [`StatementExecutor`], so each call uses its
//! own connection.
//!
//! ## Upserts
//!
//! Students and instruments are matched on their natural key with exact,
//! case-sensitive text equality. The lookup and the insert/update run in one
//! IMMEDIATE transaction, so two processes upserting the same key cannot both
//! take the insert path.
//!
//! ## Usage
//!
//! ```ignore
//! let store = InventoryStore::open_at("inventory.db")?;
//!
//! let student = store.upsert_student(&Student::new("Logan", "Reid", "04/19/1998"))?;
//! let flute = store.upsert_instrument(&Instrument::new("flute", "12345"))?;
//! store.add_assignment(flute.id, student.id, "summer loan")?;
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::types::Value;
use rusqlite::{params, OptionalExtension};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::models::{integer_at, Assignment, Instrument, Record, Student, StudentKey, Table};
use crate::storage::schema::ensure_schema;
use crate::storage::{Row, StatementExecutor, StorageError, StorageResult};

const STUDENT_ID_BY_KEY: &str =
    "SELECT id FROM students WHERE firstname = ?1 AND lastname = ?2 AND dob = ?3";

const INSERT_STUDENT: &str = "INSERT INTO students \
    (firstname, lastname, dob, address, city, state, zip, phone, notes) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

const REPLACE_STUDENT: &str = "UPDATE students SET \
    firstname = ?2, lastname = ?3, dob = ?4, address = ?5, city = ?6, \
    state = ?7, zip = ?8, phone = ?9, notes = ?10 \
    WHERE id = ?1";

const SELECT_STUDENTS: &str = "SELECT id, firstname, lastname, dob, address, city, state, zip, phone, notes \
    FROM students ORDER BY id";

const INSTRUMENT_ID_BY_SERIAL: &str = "SELECT id FROM instruments WHERE serial_num = ?1";

const INSERT_INSTRUMENT: &str =
    "INSERT INTO instruments (type, serial_num, maker, notes) VALUES (?1, ?2, ?3, ?4)";

const REPLACE_INSTRUMENT: &str =
    "UPDATE instruments SET type = ?1, serial_num = ?2, maker = ?3, notes = ?4 WHERE id = ?5";

const SELECT_INSTRUMENTS: &str =
    "SELECT id, type, serial_num, maker, notes FROM instruments ORDER BY id";

const INSERT_ASSIGNMENT: &str =
    "INSERT INTO inventory (instrument_id, student_id, notes) VALUES (?1, ?2, ?3)";

const SELECT_ASSIGNMENTS: &str =
    "SELECT id, instrument_id, student_id, notes FROM inventory ORDER BY id";

/// What an upsert did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Id of the inserted or replaced row
    pub id: i64,
    /// `true` if a new row was inserted, `false` if an existing one was replaced
    pub created: bool,
}

/// Handle to one inventory store file
pub struct InventoryStore {
    executor: StatementExecutor,
    config: Config,
}

impl InventoryStore {
    /// Open (creating if needed) the store file at `path` with default settings
    pub fn open_at(path: impl Into<PathBuf>) -> StorageResult<Self> {
        Self::open_with_config(Config::for_db_path(path))
    }

    /// Open the store described by `config`
    ///
    /// Creates the parent directory and the schema if they are missing.
    pub fn open_with_config(config: Config) -> StorageResult<Self> {
        let path = config.db_path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let executor = StatementExecutor::from_config(&config);
        executor.with_transaction("ensure_schema", |tx| ensure_schema(tx))?;
        info!(path = ?path, "sqlite store ready");

        Ok(Self { executor, config })
    }

    /// Path of the store file
    pub fn path(&self) -> &Path {
        self.executor.path()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The executor used for every statement
    pub fn executor(&self) -> &StatementExecutor {
        &self.executor
    }

    // ==================== Students ====================

    /// Insert a student, or replace every column of the existing row with
    /// the same (firstname, lastname, dob)
    pub fn upsert_student(&self, student: &Student) -> StorageResult<UpsertOutcome> {
        let outcome = self.executor.with_transaction("upsert_student", |tx| {
            let existing: Option<i64> = tx
                .query_row(
                    STUDENT_ID_BY_KEY,
                    params![student.firstname, student.lastname, student.dob],
                    |row| row.get(0),
                )
                .optional()?;

            match existing {
                Some(id) => {
                    tx.execute(
                        REPLACE_STUDENT,
                        params![
                            id,
                            student.firstname,
                            student.lastname,
                            student.dob,
                            student.address,
                            student.city,
                            student.state,
                            student.zip,
                            student.phone,
                            student.notes,
                        ],
                    )?;
                    Ok(UpsertOutcome { id, created: false })
                }
                None => {
                    tx.execute(
                        INSERT_STUDENT,
                        params![
                            student.firstname,
                            student.lastname,
                            student.dob,
                            student.address,
                            student.city,
                            student.state,
                            student.zip,
                            student.phone,
                            student.notes,
                        ],
                    )?;
                    Ok(UpsertOutcome {
                        id: tx.last_insert_rowid(),
                        created: true,
                    })
                }
            }
        })?;

        debug!(
            id = outcome.id,
            created = outcome.created,
            firstname = %student.firstname,
            lastname = %student.lastname,
            "student upserted"
        );
        Ok(outcome)
    }

    /// Look up a student's id by natural key
    pub fn find_student_id(&self, key: StudentKey<'_>) -> StorageResult<Option<i64>> {
        let rows = self.executor.execute(
            STUDENT_ID_BY_KEY,
            &[text(key.firstname), text(key.lastname), text(key.dob)],
        )?;
        Ok(first_id(rows))
    }

    /// All students in id order
    pub fn students(&self) -> StorageResult<Vec<Record<Student>>> {
        let rows = self.select(SELECT_STUDENTS)?;
        Ok(rows
            .iter()
            .map(|row| Record {
                id: integer_at(row, 0),
                data: Student::from_values(&row[1..]),
            })
            .collect())
    }

    // ==================== Instruments ====================

    /// Insert an instrument, or replace every column of the existing row with
    /// the same serial number
    pub fn upsert_instrument(&self, instrument: &Instrument) -> StorageResult<UpsertOutcome> {
        let outcome = self.executor.with_transaction("upsert_instrument", |tx| {
            let existing: Option<i64> = tx
                .query_row(
                    INSTRUMENT_ID_BY_SERIAL,
                    params![instrument.serial_num],
                    |row| row.get(0),
                )
                .optional()?;

            match existing {
                Some(id) => {
                    tx.execute(
                        REPLACE_INSTRUMENT,
                        params![
                            instrument.kind,
                            instrument.serial_num,
                            instrument.maker,
                            instrument.notes,
                            id,
                        ],
                    )?;
                    Ok(UpsertOutcome { id, created: false })
                }
                None => {
                    tx.execute(
                        INSERT_INSTRUMENT,
                        params![
                            instrument.kind,
                            instrument.serial_num,
                            instrument.maker,
                            instrument.notes,
                        ],
                    )?;
                    Ok(UpsertOutcome {
                        id: tx.last_insert_rowid(),
                        created: true,
                    })
                }
            }
        })?;

        debug!(
            id = outcome.id,
            created = outcome.created,
            serial_num = %instrument.serial_num,
            "instrument upserted"
        );
        Ok(outcome)
    }

    /// Look up an instrument's id by serial number
    pub fn find_instrument_id(&self, serial_num: &str) -> StorageResult<Option<i64>> {
        let rows = self
            .executor
            .execute(INSTRUMENT_ID_BY_SERIAL, &[text(serial_num)])?;
        Ok(first_id(rows))
    }

    /// All instruments in id order
    pub fn instruments(&self) -> StorageResult<Vec<Record<Instrument>>> {
        let rows = self.select(SELECT_INSTRUMENTS)?;
        Ok(rows
            .iter()
            .map(|row| Record {
                id: integer_at(row, 0),
                data: Instrument::from_values(&row[1..]),
            })
            .collect())
    }

    // ==================== Inventory ====================

    /// Record that an instrument was handed to a student
    ///
    /// Always appends a new row; existing assignments are not checked.
    pub fn add_assignment(
        &self,
        instrument_id: i64,
        student_id: i64,
        notes: &str,
    ) -> StorageResult<i64> {
        let id = self.executor.with_transaction("add_assignment", |tx| {
            tx.execute(INSERT_ASSIGNMENT, params![instrument_id, student_id, notes])?;
            Ok(tx.last_insert_rowid())
        })?;

        debug!(id, instrument_id, student_id, "assignment added");
        Ok(id)
    }

    /// Append several assignments in one transaction
    pub fn add_assignments(&self, assignments: &[Assignment]) -> StorageResult<()> {
        let batch: Vec<Vec<Value>> = assignments
            .iter()
            .map(|a| {
                vec![
                    Value::Integer(a.instrument_id),
                    Value::Integer(a.student_id),
                    text(&a.notes),
                ]
            })
            .collect();
        self.executor.execute_many(INSERT_ASSIGNMENT, &batch)
    }

    /// All assignments in id order
    pub fn assignments(&self) -> StorageResult<Vec<Record<Assignment>>> {
        let rows = self.select(SELECT_ASSIGNMENTS)?;
        Ok(rows
            .iter()
            .map(|row| Record {
                id: integer_at(row, 0),
                data: Assignment::from_values(&row[1..]),
            })
            .collect())
    }

    // ==================== Raw reads ====================

    /// Every row of a table, all columns, in ascending id order
    pub fn read_table(&self, table: Table) -> StorageResult<Vec<Row>> {
        let stmt = format!("SELECT * FROM {} ORDER BY id", table.as_str());
        let rows = self.select(&stmt)?;

        if rows.is_empty() {
            error!(table = %table, path = ?self.path(), statement = %stmt, "No results found");
        }
        Ok(rows)
    }

    /// Number of rows in a table
    pub fn count(&self, table: Table) -> StorageResult<i64> {
        let rows = self.select(&format!("SELECT COUNT(*) FROM {}", table.as_str()))?;
        Ok(first_id(Some(rows)).unwrap_or(0))
    }

    fn select(&self, stmt: &str) -> StorageResult<Vec<Row>> {
        Ok(self.executor.execute(stmt, &[])?.unwrap_or_default())
    }
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn first_id(rows: Option<Vec<Row>>) -> Option<i64> {
    rows.and_then(|rows| rows.into_iter().next())
        .map(|row| integer_at(&row, 0))
}
