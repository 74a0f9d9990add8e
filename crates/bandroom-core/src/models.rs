//! Data models for Bandroom
//!
//! Defines the stored entities: Student, Instrument, and Assignment.
//! Ids are assigned by the store; values are written exactly as given,
//! with no validation of dates, zip codes, or phone numbers.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

use crate::storage::schema::{INSTRUMENTS_TABLE, INVENTORY_TABLE, STUDENTS_TABLE};

/// A student, unique by (firstname, lastname, dob)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Student {
    pub firstname: String,
    pub lastname: String,
    /// Date of birth, unvalidated
    ///
    /// The column has NUMERIC affinity, so number-like values are normalised
    /// on write: `"007"` is stored as the integer 7 and reads back as `"7"`.
    /// Anything else (e.g. `"04/19/1998"`) is kept as text.
    pub dob: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub phone: String,
    pub notes: String,
}

impl Student {
    /// Create a student with only the natural key set
    pub fn new(
        firstname: impl Into<String>,
        lastname: impl Into<String>,
        dob: impl Into<String>,
    ) -> Self {
        Self {
            firstname: firstname.into(),
            lastname: lastname.into(),
            dob: dob.into(),
            ..Self::default()
        }
    }

    /// The natural key identifying this student
    pub fn key(&self) -> StudentKey<'_> {
        StudentKey {
            firstname: &self.firstname,
            lastname: &self.lastname,
            dob: &self.dob,
        }
    }

    /// Build from a row of (firstname, lastname, dob, address, city, state,
    /// zip, phone, notes)
    pub(crate) fn from_values(values: &[Value]) -> Self {
        Self {
            firstname: text_at(values, 0),
            lastname: text_at(values, 1),
            dob: text_at(values, 2),
            address: text_at(values, 3),
            city: text_at(values, 4),
            state: text_at(values, 5),
            zip: text_at(values, 6),
            phone: text_at(values, 7),
            notes: text_at(values, 8),
        }
    }
}

/// Borrowed natural key of a student
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudentKey<'a> {
    pub firstname: &'a str,
    pub lastname: &'a str,
    pub dob: &'a str,
}

/// An instrument, unique by serial number
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Instrument {
    /// Kind of instrument, e.g. "flute"
    #[serde(rename = "type")]
    pub kind: String,
    pub serial_num: String,
    /// Manufacturer, e.g. "bach"
    pub maker: String,
    pub notes: String,
}

impl Instrument {
    pub fn new(kind: impl Into<String>, serial_num: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            serial_num: serial_num.into(),
            ..Self::default()
        }
    }

    /// Build from a row of (type, serial_num, maker, notes)
    pub(crate) fn from_values(values: &[Value]) -> Self {
        Self {
            kind: text_at(values, 0),
            serial_num: text_at(values, 1),
            maker: text_at(values, 2),
            notes: text_at(values, 3),
        }
    }
}

/// An instrument handed out to a student
///
/// Neither id is checked against the other tables, and the same pair may be
/// recorded any number of times.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Assignment {
    pub instrument_id: i64,
    pub student_id: i64,
    pub notes: String,
}

impl Assignment {
    /// Build from a row of (instrument_id, student_id, notes)
    pub(crate) fn from_values(values: &[Value]) -> Self {
        Self {
            instrument_id: integer_at(values, 0),
            student_id: integer_at(values, 1),
            notes: text_at(values, 2),
        }
    }
}

/// A stored row together with its store-assigned id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record<T> {
    pub id: i64,
    #[serde(flatten)]
    pub data: T,
}

/// The fixed set of tables; names are never taken from user input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Instruments,
    Students,
    Inventory,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Instruments, Table::Students, Table::Inventory];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Instruments => INSTRUMENTS_TABLE,
            Table::Students => STUDENTS_TABLE,
            Table::Inventory => INVENTORY_TABLE,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "unknown table '{}' (expected instruments, students, or inventory)",
                    s
                )
            })
    }
}

/// Render a stored value as text
///
/// Columns with NUMERIC affinity (`dob`) may hand back numbers for
/// number-like input, so everything is rendered rather than rejected.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) => r.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => String::from_utf8_lossy(b).into_owned(),
    }
}

fn text_at(values: &[Value], index: usize) -> String {
    values.get(index).map(value_to_text).unwrap_or_default()
}

pub(crate) fn integer_at(values: &[Value], index: usize) -> i64 {
    match values.get(index) {
        Some(Value::Integer(i)) => *i,
        Some(Value::Text(s)) => s.trim().parse().unwrap_or_default(),
        Some(Value::Real(r)) => *r as i64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_key_borrows_natural_key() {
        let student = Student::new("Logan", "Reid", "04/19/1998");
        let key = student.key();
        assert_eq!(key.firstname, "Logan");
        assert_eq!(key.lastname, "Reid");
        assert_eq!(key.dob, "04/19/1998");
        assert!(student.notes.is_empty());
    }

    #[test]
    fn test_table_parse() {
        assert_eq!("students".parse::<Table>().unwrap(), Table::Students);
        assert_eq!("INVENTORY".parse::<Table>().unwrap(), Table::Inventory);
        assert!("students; DROP TABLE students".parse::<Table>().is_err());
        assert_eq!(Table::Instruments.to_string(), "instruments");
    }

    #[test]
    fn test_numeric_dob_renders_as_text() {
        let values = vec![
            Value::Text("Nikolai".into()),
            Value::Text("Richards".into()),
            Value::Integer(2002),
        ];
        let student = Student::from_values(&values);
        assert_eq!(student.dob, "2002");
        // Missing trailing columns come back empty
        assert_eq!(student.notes, "");
    }

    #[test]
    fn test_instrument_serializes_kind_as_type() {
        let mut instrument = Instrument::new("flute", "12345");
        instrument.maker = "bach".to_string();
        let record = Record {
            id: 1,
            data: instrument,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["type"], "flute");
        assert_eq!(json["serial_num"], "12345");
    }

    #[test]
    fn test_assignment_from_values() {
        let values = vec![
            Value::Integer(2),
            Value::Integer(1),
            Value::Null,
        ];
        let assignment = Assignment::from_values(&values);
        assert_eq!(assignment.instrument_id, 2);
        assert_eq!(assignment.student_id, 1);
        assert_eq!(assignment.notes, "");
    }
}
