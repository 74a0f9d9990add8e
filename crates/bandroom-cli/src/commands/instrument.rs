//! Instrument command handlers

use anyhow::{Context, Result};

use bandroom_core::{Instrument, InventoryStore};

use crate::output::Output;

/// Add an instrument, or update the one with the same serial number
pub fn add(store: &InventoryStore, instrument: Instrument, output: &Output) -> Result<()> {
    let outcome = store
        .upsert_instrument(&instrument)
        .with_context(|| format!("Failed to save instrument {}", instrument.serial_num))?;

    output.print_upsert("instrument", outcome);
    Ok(())
}

/// List all instruments
pub fn list(store: &InventoryStore, output: &Output) -> Result<()> {
    let instruments = store.instruments()?;
    output.print_instruments(&instruments);
    Ok(())
}
