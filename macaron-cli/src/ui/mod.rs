//! Terminal UI utilities

use colored::{ColoredString, Colorize};
use console::Term;
use indicatif::{ProgressBar, ProgressStyle};
use macaron_core::{InterfaceRecord, InterfaceStatus, OperationOutcome};
use std::time::Duration;

/// Status markers, one per message class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mark {
    Ok,
    Failed,
    Note,
    Caution,
}

impl Mark {
    fn symbol(self) -> ColoredString {
        match self {
            Self::Ok => "✓".green().bold(),
            Self::Failed => "✗".red().bold(),
            Self::Note => "ℹ".blue().bold(),
            Self::Caution => "⚠".yellow().bold(),
        }
    }
}

/// A marked line; failures and cautions go to stderr so `--json` output
/// on stdout stays parseable.
fn emit(mark: Mark, message: &str) {
    match mark {
        Mark::Ok | Mark::Note => println!("{} {}", mark.symbol(), message),
        Mark::Failed | Mark::Caution => eprintln!("{} {}", mark.symbol(), message),
    }
}

pub fn success(message: &str) {
    emit(Mark::Ok, message);
}

pub fn error(message: &str) {
    emit(Mark::Failed, message);
}

pub fn info(message: &str) {
    emit(Mark::Note, message);
}

pub fn warning(message: &str) {
    emit(Mark::Caution, message);
}

/// Blank line, then the title in bold
pub fn header(title: &str) {
    println!();
    println!("{}", title.to_uppercase().bold());
}

/// Key column padded so values line up
pub fn key_label(key: &str) -> String {
    format!("{:<12}", format!("{}:", key))
}

pub fn key_value(key: &str, value: &str) {
    println!("  {} {}", key_label(key).cyan(), value);
}

/// Print a separator line sized to the terminal
pub fn separator() {
    let width = Term::stdout().size_checked().map(|(_, w)| w as usize).unwrap_or(60);
    println!("{}", "─".repeat(width.min(80)).dimmed());
}

/// Create a spinner progress indicator
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Yes/no prompt on stderr; a closed terminal counts as "no".
pub fn confirm(prompt: &str, default: bool) -> anyhow::Result<bool> {
    let answer = dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact_on_opt(&Term::stderr())?;
    Ok(answer.unwrap_or(false))
}

/// Print JSON prettily
pub fn json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Status column, colored by state
pub fn status_label(status: InterfaceStatus) -> String {
    let label = status.as_str();
    match status {
        InterfaceStatus::Applied | InterfaceStatus::Restored => label.green().to_string(),
        InterfaceStatus::Failed => label.red().to_string(),
        InterfaceStatus::Applying | InterfaceStatus::Restoring => label.yellow().to_string(),
        InterfaceStatus::Idle | InterfaceStatus::Unknown => label.dimmed().to_string(),
    }
}

/// One table row per interface
pub fn interface_table(records: &[InterfaceRecord]) {
    println!(
        "  {:<16} {:<10} {:<18} {:<18} {}",
        "INTERFACE".bold(),
        "KIND".bold(),
        "CURRENT".bold(),
        "ORIGINAL".bold(),
        "STATUS".bold()
    );
    for record in records {
        println!(
            "  {:<16} {:<10} {:<18} {:<18} {}",
            record.name,
            record.kind.as_str(),
            format_address(record.current_address),
            format_address(record.original_address),
            status_label(record.status)
        );
    }
}

/// Report each outcome; returns the number of failures
pub fn outcomes(outcomes: &[OperationOutcome]) -> usize {
    let mut failed = 0;
    for outcome in outcomes {
        match &outcome.result {
            Ok(address) => success(&format!("{}: {}", outcome.interface, address)),
            Err(err) => {
                failed += 1;
                error(&format!("{}: [{}] {}", outcome.interface, err.kind(), err));
            }
        }
    }
    failed
}

pub fn format_address(address: Option<macaron_core::MacAddress>) -> String {
    address
        .map(|a| a.to_string())
        .unwrap_or_else(|| "-".to_string())
}
