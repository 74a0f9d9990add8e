//! Student command handlers

use anyhow::{Context, Result};

use bandroom_core::{InventoryStore, Student};

use crate::output::Output;

/// Add a student, or update the one with the same name and date of birth
pub fn add(store: &InventoryStore, student: Student, output: &Output) -> Result<()> {
    let outcome = store
        .upsert_student(&student)
        .with_context(|| {
            format!(
                "Failed to save student {} {}",
                student.firstname, student.lastname
            )
        })?;

    output.print_upsert("student", outcome);
    Ok(())
}

/// List all students
pub fn list(store: &InventoryStore, output: &Output) -> Result<()> {
    let students = store.students()?;
    output.print_students(&students);
    Ok(())
}
