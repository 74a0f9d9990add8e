//! SQLite schema for the inventory store
//!
//! Column names, order, and declared types are part of the on-disk format
//! shared with existing store files, so they must not change.
//!
//! Table creation and unique index creation are separate steps. Tables use
//! `CREATE TABLE IF NOT EXISTS`; each unique index is created only after an
//! explicit `sqlite_master` lookup, because the upsert statements depend on
//! those indexes existing exactly once.

use rusqlite::{params, Connection, Result};

/// Table holding instruments, unique by serial number
pub const INSTRUMENTS_TABLE: &str = "instruments";
/// Table holding students, unique by (firstname, lastname, dob)
pub const STUDENTS_TABLE: &str = "students";
/// Table holding instrument/student assignments
pub const INVENTORY_TABLE: &str = "inventory";

/// Unique index on `instruments(serial_num)`
pub const SERIAL_NUMBER_INDEX: &str = "serial_number";
/// Unique index on `students(firstname, lastname, dob)`
pub const FIRST_LAST_DOB_INDEX: &str = "first_last_dob";

const CREATE_INSTRUMENTS: &str = r#"
    CREATE TABLE IF NOT EXISTS instruments (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        type       CHAR(50),
        serial_num CHAR(50),
        maker      CHAR(50),
        notes      CHAR(200)
    )
"#;

const CREATE_STUDENTS: &str = r#"
    CREATE TABLE IF NOT EXISTS students (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        firstname  CHAR(50),
        lastname   CHAR(50),
        dob        DATETIME,
        address    CHAR(50),
        city       CHAR(50),
        state      CHAR(50),
        zip        CHAR(50),
        phone      CHAR(50),
        notes      CHAR(200)
    )
"#;

const CREATE_INVENTORY: &str = r#"
    CREATE TABLE IF NOT EXISTS inventory (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        instrument_id INTEGER,
        student_id    INTEGER,
        notes         CHAR(200)
    )
"#;

/// Unique indexes, in creation order: (index name, create statement)
const UNIQUE_INDEXES: &[(&str, &str)] = &[
    (
        SERIAL_NUMBER_INDEX,
        "CREATE UNIQUE INDEX serial_number ON instruments (serial_num)",
    ),
    (
        FIRST_LAST_DOB_INDEX,
        "CREATE UNIQUE INDEX first_last_dob ON students (firstname, lastname, dob)",
    ),
];

/// Create all tables and unique indexes that don't exist yet
///
/// Safe to call on every startup, against a fresh or an initialized store.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    create_tables(conn)?;
    create_indexes(conn)?;
    Ok(())
}

/// Create the three tables, in fixed order: instruments, students, inventory
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_INSTRUMENTS)?;
    conn.execute_batch(CREATE_STUDENTS)?;
    conn.execute_batch(CREATE_INVENTORY)?;
    Ok(())
}

/// Create each unique index unless an index of that name already exists
///
/// Returns the names of the indexes created by this call.
pub fn create_indexes(conn: &Connection) -> Result<Vec<&'static str>> {
    let mut created = Vec::new();
    for (name, stmt) in UNIQUE_INDEXES {
        if index_exists(conn, name)? {
            continue;
        }
        conn.execute_batch(stmt)?;
        created.push(*name);
    }
    Ok(created)
}

/// Check if an index with this name is present
pub fn index_exists(conn: &Connection, name: &str) -> Result<bool> {
    conn.prepare("SELECT 1 FROM sqlite_master WHERE type = 'index' AND name = ?1")?
        .exists(params![name])
}

/// Names of all user tables, sorted
pub fn table_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>>>()?;
    Ok(names)
}

/// Check if the store still needs `ensure_schema`
pub fn needs_init(conn: &Connection) -> bool {
    let tables = match table_names(conn) {
        Ok(tables) => tables,
        Err(_) => return true,
    };
    let has_tables = [INSTRUMENTS_TABLE, STUDENTS_TABLE, INVENTORY_TABLE]
        .iter()
        .all(|t| tables.iter().any(|name| name == t));

    let has_indexes = UNIQUE_INDEXES
        .iter()
        .all(|(name, _)| index_exists(conn, name).unwrap_or(false));

    !(has_tables && has_indexes)
}
