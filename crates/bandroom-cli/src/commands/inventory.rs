//! Assignment and raw table command handlers

use anyhow::{Context, Result};

use bandroom_core::{InventoryStore, Table};

use crate::output::{Output, OutputFormat};

/// Record an instrument going out to a student
///
/// Neither id is checked; assigning the same pair twice records it twice.
pub fn assign(
    store: &InventoryStore,
    instrument_id: i64,
    student_id: i64,
    notes: String,
    output: &Output,
) -> Result<()> {
    let id = store
        .add_assignment(instrument_id, student_id, &notes)
        .context("Failed to record assignment")?;

    output.success(&format!(
        "Assigned instrument #{} to student #{} (assignment #{})",
        instrument_id, student_id, id
    ));
    Ok(())
}

/// List all assignments
pub fn list(store: &InventoryStore, output: &Output) -> Result<()> {
    let assignments = store.assignments()?;
    output.print_assignments(&assignments);
    Ok(())
}

/// Print every row of one table, all columns
pub fn dump(store: &InventoryStore, table: Table, output: &Output) -> Result<()> {
    let rows = store
        .read_table(table)
        .with_context(|| format!("Failed to read table {}", table))?;
    if rows.is_empty() && output.format == OutputFormat::Human {
        output.message(&format!("No rows in {}.", table));
        return Ok(());
    }
    output.print_rows(&rows);
    Ok(())
}
