//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use bandroom_core::models::value_to_text;
use bandroom_core::{Assignment, Instrument, Record, Row, Student, UpsertOutcome, Value};
use serde::Serialize;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print the result of an upsert
    pub fn print_upsert(&self, what: &str, outcome: UpsertOutcome) {
        match self.format {
            OutputFormat::Human => {
                let verb = if outcome.created { "Added" } else { "Updated" };
                println!("✓ {} {} #{}", verb, what, outcome.id);
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"id": outcome.id, "created": outcome.created})
                );
            }
            OutputFormat::Quiet => println!("{}", outcome.id),
        }
    }

    /// Print a list of students
    pub fn print_students(&self, students: &[Record<Student>]) {
        match self.format {
            OutputFormat::Human => {
                if students.is_empty() {
                    println!("No students found.");
                    return;
                }
                for s in students {
                    println!(
                        "{:>4} | {} {} | {} | {} | {}",
                        s.id,
                        s.data.firstname,
                        s.data.lastname,
                        s.data.dob,
                        s.data.phone,
                        truncate(&s.data.notes, 40)
                    );
                }
                println!("\n{} student(s)", students.len());
            }
            OutputFormat::Json => print_json(&students),
            OutputFormat::Quiet => {
                for s in students {
                    println!("{}", s.id);
                }
            }
        }
    }

    /// Print a list of instruments
    pub fn print_instruments(&self, instruments: &[Record<Instrument>]) {
        match self.format {
            OutputFormat::Human => {
                if instruments.is_empty() {
                    println!("No instruments found.");
                    return;
                }
                for i in instruments {
                    println!(
                        "{:>4} | {} | {} | {} | {}",
                        i.id,
                        i.data.kind,
                        i.data.serial_num,
                        i.data.maker,
                        truncate(&i.data.notes, 40)
                    );
                }
                println!("\n{} instrument(s)", instruments.len());
            }
            OutputFormat::Json => print_json(&instruments),
            OutputFormat::Quiet => {
                for i in instruments {
                    println!("{}", i.id);
                }
            }
        }
    }

    /// Print a list of assignments
    pub fn print_assignments(&self, assignments: &[Record<Assignment>]) {
        match self.format {
            OutputFormat::Human => {
                if assignments.is_empty() {
                    println!("No assignments found.");
                    return;
                }
                for a in assignments {
                    println!(
                        "{:>4} | instrument #{} -> student #{} | {}",
                        a.id,
                        a.data.instrument_id,
                        a.data.student_id,
                        truncate(&a.data.notes, 40)
                    );
                }
                println!("\n{} assignment(s)", assignments.len());
            }
            OutputFormat::Json => print_json(&assignments),
            OutputFormat::Quiet => {
                for a in assignments {
                    println!("{}", a.id);
                }
            }
        }
    }

    /// Print raw table rows
    pub fn print_rows(&self, rows: &[Row]) {
        match self.format {
            OutputFormat::Human => {
                for row in rows {
                    println!("{}", format_row(row));
                }
                println!("\n{} row(s)", rows.len());
            }
            OutputFormat::Json => {
                let rows: Vec<Vec<serde_json::Value>> = rows
                    .iter()
                    .map(|row| row.iter().map(value_to_json).collect())
                    .collect();
                print_json(&rows);
            }
            OutputFormat::Quiet => {
                for row in rows {
                    if let Some(id) = row.first() {
                        println!("{}", value_to_text(id));
                    }
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

/// Render a row as a tuple: `(1, 'flute', '12345', 'bach', '')`
fn format_row(row: &Row) -> String {
    let cells: Vec<String> = row
        .iter()
        .map(|value| match value {
            Value::Text(s) => format!("'{}'", s),
            Value::Null => "NULL".to_string(),
            other => value_to_text(other),
        })
        .collect();
    format!("({})", cells.join(", "))
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => serde_json::json!(i),
        Value::Real(r) => serde_json::json!(r),
        Value::Text(_) | Value::Blob(_) => serde_json::Value::String(value_to_text(value)),
    }
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
