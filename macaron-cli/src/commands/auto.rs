//! Unattended periodic randomization

use anyhow::Result;
use chrono::{DateTime, Utc};
use macaron_core::scheduler::{validate_interval, FiringReport};
use macaron_core::{MacaronEngine, StartOutcome};
use std::time::Duration;

use crate::ui;

pub async fn run(engine: &MacaronEngine, interval_minutes: u32) -> Result<()> {
    validate_interval(interval_minutes)?;
    let records = engine.refresh().await?;

    ui::header("Auto Mode");
    ui::key_value("Interval", &format!("{} minute(s)", interval_minutes));
    ui::key_value(
        "Interfaces",
        &records
            .iter()
            .map(|r| r.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    );

    if engine.start(interval_minutes)? == StartOutcome::AlreadyRunning {
        ui::warning("Scheduler already running");
    }
    ui::info("First randomization after one full interval. Press Ctrl+C to stop.");

    let mut last_seen: Option<DateTime<Utc>> = None;
    let (mut firings, mut changed) = (0usize, 0usize);
    let mut poll = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(err) = signal {
                    ui::warning(&format!("Signal handler failed: {}", err));
                }
                break;
            }
            _ = poll.tick() => {
                let (fired, succeeded) = print_new_firings(engine, &mut last_seen);
                firings += fired;
                changed += succeeded;
            }
        }
    }

    let spinner = ui::spinner("Waiting for the current randomization to finish...");
    engine.shutdown().await;
    spinner.finish_and_clear();
    let (fired, succeeded) = print_new_firings(engine, &mut last_seen);
    firings += fired;
    changed += succeeded;
    ui::separator();
    ui::success(&format!(
        "Stopped after {} firing(s), {} address change(s)",
        firings, changed
    ));
    Ok(())
}

/// Print reports newer than `last_seen`; returns (firings, changes).
fn print_new_firings(
    engine: &MacaronEngine,
    last_seen: &mut Option<DateTime<Utc>>,
) -> (usize, usize) {
    let (mut firings, mut changed) = (0, 0);
    for report in engine.firing_reports() {
        if last_seen.map_or(true, |seen| report.fired_at > seen) {
            print_firing(&report);
            firings += 1;
            changed += report.succeeded();
            *last_seen = Some(report.fired_at);
        }
    }
    (firings, changed)
}

fn print_firing(report: &FiringReport) {
    let at = report.fired_at.with_timezone(&chrono::Local).format("%H:%M:%S");
    if report.failed() == 0 {
        ui::success(&format!("[{}] randomized {} interface(s)", at, report.succeeded()));
    } else {
        ui::warning(&format!(
            "[{}] randomized {}, failed {}",
            at,
            report.succeeded(),
            report.failed()
        ));
    }
    ui::outcomes(&report.outcomes);
}
