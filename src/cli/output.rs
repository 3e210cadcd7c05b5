//! Operator-facing CLI output.
//!
//! Human-readable lines with colored status symbols, or one JSON object per
//! line (`--json`) for scripting. Errors always go to stderr.

use std::fmt::Display;
use std::sync::OnceLock;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use serde_json::{json, Value};

use crate::domain::Phase;
use crate::error::PhaseError;

/// Output settings taken from the global CLI flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// One JSON object per line instead of human-readable text.
    pub json: bool,
    /// Drop informational lines; warnings, errors and JSON still print.
    pub quiet: bool,
}

impl OutputConfig {
    #[must_use]
    pub const fn new(json: bool, quiet: bool) -> Self {
        Self { json, quiet }
    }
}

static OUTPUT: OnceLock<OutputConfig> = OnceLock::new();

/// Apply output settings. Only the first call takes effect.
pub fn configure(config: OutputConfig) {
    let _ = OUTPUT.set(config);
}

fn settings() -> OutputConfig {
    OUTPUT.get().copied().unwrap_or_default()
}

#[must_use]
pub fn is_json() -> bool {
    settings().json
}

/// Emit a JSON line with type and payload structure.
pub fn emit_json(kind: &str, payload: Value) {
    println!("{}", json!({ "type": kind, "payload": payload }));
}

/// JSON mode emits `kind`/`payload`; text mode runs `human` unless the line
/// is informational and `--quiet` is set.
fn emit(kind: &str, payload: Value, informational: bool, human: impl FnOnce()) {
    let config = settings();
    if config.json {
        emit_json(kind, payload);
    } else if !(informational && config.quiet) {
        human();
    }
}

/// Print the application header.
pub fn header(version: &str) {
    emit(
        "header",
        json!({ "app": "sitedeploy", "version": version }),
        true,
        || println!("{} {}", "sitedeploy".bold(), version.dimmed()),
    );
}

/// Print a section title.
pub fn section(title: &str) {
    emit("section", json!({ "title": title }), true, || {
        println!();
        println!("{}", title.bold());
    });
}

/// Print a labeled value.
pub fn field(label: &str, value: impl Display) {
    let value = value.to_string();
    emit(
        "field",
        json!({ "label": label, "value": &value }),
        true,
        || println!("  {:<14} {}", label.dimmed(), value),
    );
}

pub fn success(message: &str) {
    emit("success", json!({ "message": message }), true, || {
        println!("  {} {}", "✓".green(), message);
    });
}

/// Warnings print even with `--quiet`.
pub fn warning(message: &str) {
    emit("warning", json!({ "message": message }), false, || {
        println!("  {} {}", "⚠".yellow(), message);
    });
}

pub fn note(message: &str) {
    emit("note", json!({ "message": message }), true, || {
        println!("  {}", message.dimmed());
    });
}

/// Print an error line to stderr.
pub fn error(message: &str) {
    if is_json() {
        eprintln!("{}", json!({ "type": "error", "payload": { "message": message } }));
    } else {
        eprintln!("  {} {}", "×".red(), message);
    }
}

/// Dimmed text; plain in JSON mode.
pub fn muted(value: impl Display) -> String {
    let value = value.to_string();
    if is_json() {
        value
    } else {
        value.dimmed().to_string()
    }
}

const BRAILLE_SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Spinner shown while `phase` runs. Hidden in JSON or quiet mode.
pub fn phase_spinner(phase: &Phase) -> ProgressBar {
    let message = format!("{} {}", phase.name(), muted(phase.describe()));
    let config = settings();
    if config.json || config.quiet {
        let pb = ProgressBar::hidden();
        pb.set_message(message);
        return pb;
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(BRAILLE_SPINNER)
        .template("  {spinner:.cyan} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Replace the spinner with the phase outcome.
pub fn finish_phase(pb: &ProgressBar, phase: &Phase, outcome: &Result<String, PhaseError>) {
    let config = settings();
    if config.json || config.quiet {
        pb.finish_and_clear();
        return;
    }

    let line = match outcome {
        Ok(output) if output == "unchanged" => {
            format!("{} {} {}", "✓".green(), phase.name(), muted("unchanged"))
        }
        Ok(_) => format!("{} {}", "✓".green(), phase.name()),
        Err(err) => format!("{} {}: {err}", "×".red(), phase.name()),
    };
    pb.finish_with_message(line);
}
