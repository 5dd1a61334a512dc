//! Apply fresh random addresses

use anyhow::{bail, Result};
use macaron_core::MacaronEngine;

use super::resolve_targets;
use crate::ui;

pub async fn run(engine: &MacaronEngine, names: &[String], all: bool, yes: bool) -> Result<()> {
    let targets = resolve_targets(names, all)?;
    engine.refresh().await?;

    let targets = targets.unwrap_or_else(|| engine.registry().all_eligible());
    if targets.is_empty() {
        ui::warning("No eligible interfaces");
        return Ok(());
    }

    if !yes {
        let prompt = format!(
            "Randomize {}? Connections on these interfaces will drop briefly",
            targets.join(", ")
        );
        if !ui::confirm(&prompt, true)? {
            ui::info("Cancelled");
            return Ok(());
        }
    }

    let spinner = ui::spinner("Applying new addresses...");
    let outcomes = engine.apply_many(&targets).await;
    spinner.finish_and_clear();

    ui::header("Randomization");
    let failed = ui::outcomes(&outcomes);
    if failed > 0 {
        bail!("{} of {} interface(s) failed", failed, outcomes.len());
    }
    Ok(())
}
