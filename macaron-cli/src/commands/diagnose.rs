//! Report tool availability and privileges

use anyhow::Result;
use macaron_core::diagnostics::{diagnose, Readiness};

use crate::ui;

pub fn run(json: bool) -> Result<()> {
    let report = diagnose();
    if json {
        return ui::json(&report);
    }

    ui::header("Diagnostics");
    for check in &report.tools {
        match &check.path {
            Some(path) => ui::success(&format!("{:<10} {}", check.tool, path.display())),
            None => ui::warning(&format!("{:<10} not found", check.tool)),
        }
    }
    if report.privileged {
        ui::success("Running as root");
    } else {
        ui::warning("Not running as root; address changes need root or --sudo");
    }

    ui::separator();
    match report.readiness() {
        Readiness::Ready => ui::success("Ready"),
        Readiness::Degraded => ui::warning("Usable with limitations"),
        Readiness::Unavailable => ui::error("Neither ip nor ifconfig is available"),
    }
    Ok(())
}
