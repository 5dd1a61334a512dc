//! Put interfaces back on their original addresses

use anyhow::{bail, Result};
use macaron_core::MacaronEngine;

use super::resolve_targets;
use crate::ui;

pub async fn run(engine: &MacaronEngine, names: &[String], all: bool) -> Result<()> {
    let targets = resolve_targets(names, all)?;
    engine.refresh().await?;

    let outcomes = match targets {
        Some(names) => {
            let spinner = ui::spinner("Restoring original addresses...");
            let outcomes = engine.restore_many(&names).await;
            spinner.finish_and_clear();
            outcomes
        }
        None => {
            let spinner = ui::spinner("Restoring every interface...");
            let outcomes = engine.restore_all().await;
            spinner.finish_and_clear();
            outcomes
        }
    };

    if outcomes.is_empty() {
        ui::warning("No interface has a known original address");
        return Ok(());
    }

    ui::header("Restore");
    let failed = ui::outcomes(&outcomes);
    if failed > 0 {
        bail!("{} of {} interface(s) failed", failed, outcomes.len());
    }
    Ok(())
}
