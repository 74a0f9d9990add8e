//! Status command handler

use anyhow::Result;

use bandroom_core::{InventoryStore, Table};

use crate::output::{Output, OutputFormat};

/// Show where the store lives and how much is in it
pub fn show(store: &InventoryStore, output: &Output) -> Result<()> {
    let config = store.config();
    let path = store.path();
    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    let students = store.count(Table::Students)?;
    let instruments = store.count(Table::Instruments)?;
    let assignments = store.count(Table::Inventory)?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "path": path,
                    "size": size,
                    "counts": {
                        "students": students,
                        "instruments": instruments,
                        "assignments": assignments
                    },
                    "retry": {
                        "max_attempts": config.max_attempts,
                        "backoff_ms": config.retry_backoff_ms,
                        "busy_timeout_ms": config.busy_timeout_ms,
                        "repair_on_lock": config.repair_on_lock
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", path.display());
        }
        OutputFormat::Human => {
            println!("Bandroom Status");
            println!("===============");
            println!();
            println!("Store:");
            println!("  Path: {}", path.display());
            println!("  Size: {}", format_size(size));
            println!();
            println!("Contents:");
            println!("  Students:    {}", students);
            println!("  Instruments: {}", instruments);
            println!("  Assignments: {}", assignments);
            println!();
            println!("Lock handling:");
            println!("  Attempts:     {}", config.max_attempts);
            println!("  Backoff:      {} ms", config.retry_backoff_ms);
            println!("  Busy timeout: {} ms", config.busy_timeout_ms);
            println!(
                "  Repair:       {}",
                if config.repair_on_lock {
                    "enabled"
                } else {
                    "disabled"
                }
            );
        }
    }

    Ok(())
}

/// Format bytes as a human-readable size
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
