//! List physical interfaces and their addresses

use anyhow::Result;
use macaron_core::MacaronEngine;

use crate::ui;

pub async fn run(engine: &MacaronEngine, json: bool, verbose: bool) -> Result<()> {
    let records = engine.refresh().await?;

    if json {
        return ui::json(&records);
    }

    ui::header("Network Interfaces");
    if records.is_empty() {
        ui::warning("No physical interfaces found");
        return Ok(());
    }
    ui::interface_table(&records);

    if verbose {
        ui::separator();
        for record in records.iter().filter(|r| r.original_address.is_none()) {
            ui::info(&format!(
                "{}: no original address captured, restore unavailable",
                record.name
            ));
        }
    }

    let randomized = records.iter().filter(|r| r.is_randomized()).count();
    if randomized > 0 {
        ui::info(&format!("{} interface(s) currently randomized", randomized));
    }
    Ok(())
}
