//! Run report, summary rendering and live progress output.
//!
//! The orchestrator builds a [`RunReport`] and notifies a [`ProgressSink`] as it
//! goes. Rendering is a pure projection of the finished report ([`render`]); it
//! never re-derives success. Sinks decouple what is shown while steps execute from
//! the execution itself, so a structured sink can sit next to [`ConsoleSink`].

use std::fmt::Write as _;

use owo_colors::{OwoColorize, Stream};

use crate::backup::BackupRecord;
use crate::error::FatalError;
use crate::orchestrator::RunState;
use crate::step::StepResult;

pub mod symbols {
    pub const OK: &str = "[ OK ]";
    pub const FAIL: &str = "[FAIL]";
    pub const SKIP: &str = "[SKIP]";
    pub const ARROW: &str = "==>";
}

/// One evaluated step and its outcome
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub name: String,
    pub result: StepResult,
    /// Backups written while this step ran, oldest first
    pub backups: Vec<BackupRecord>,
}

/// Everything that happened in one run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Terminal state of the run (Completed or Aborted)
    pub state: RunState,
    /// Executed steps in execution order, preceded by the update/upgrade precondition
    pub entries: Vec<StepRecord>,
    /// Steps whose enablement flag was off; never executed
    pub disabled: Vec<String>,
    /// Why the run was aborted, if it was
    pub fatal: Option<FatalError>,
}

impl RunReport {
    pub(crate) fn new() -> Self {
        Self {
            state: RunState::NotStarted,
            entries: Vec::new(),
            disabled: Vec::new(),
            fatal: None,
        }
    }

    /// Entry for the named step, if it was executed
    pub fn entry(&self, name: &str) -> Option<&StepRecord> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.result.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.iter().filter(|e| e.result.is_failure()).count()
    }

    pub fn skipped(&self) -> usize {
        self.entries.iter().filter(|e| e.result.is_skipped()).count()
    }

    /// All backups written during the run
    pub fn backups(&self) -> impl Iterator<Item = &BackupRecord> {
        self.entries.iter().flat_map(|e| e.backups.iter())
    }

    /// Process exit code: 0 unless a fatal precondition failed
    pub fn exit_code(&self) -> i32 {
        if self.state == RunState::Completed { 0 } else { 1 }
    }
}

fn tag(result: &StepResult) -> &'static str {
    match result {
        StepResult::Success { .. } => symbols::OK,
        StepResult::Failure { .. } => symbols::FAIL,
        StepResult::Skipped { .. } => symbols::SKIP,
    }
}

/// Render the final human-readable summary
pub fn render(report: &RunReport) -> String {
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "Summary");
    let _ = writeln!(out, "=======");

    for entry in &report.entries {
        let _ = writeln!(out, "{} {}: {}", tag(&entry.result), entry.name, entry.result.message());
    }

    let backups: Vec<&BackupRecord> = report.backups().collect();
    if !backups.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Backups written:");
        for record in backups {
            let _ = writeln!(
                out,
                "  {} -> {}",
                record.original.display(),
                record.backup.display()
            );
        }
    }

    if !report.disabled.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Disabled by configuration: {}", report.disabled.join(", "));
    }

    let _ = writeln!(out);
    match (&report.state, &report.fatal) {
        (RunState::Aborted, Some(err)) => {
            let _ = writeln!(out, "Run aborted: {}", err);
        }
        _ => {
            let _ = writeln!(
                out,
                "Run {}: {} succeeded, {} failed, {} skipped",
                report.state,
                report.succeeded(),
                report.failed(),
                report.skipped()
            );
        }
    }

    out
}

/// Receives progress events while a run executes.
///
/// Every method has an empty default so a sink only implements what it shows.
pub trait ProgressSink {
    fn step_started(&mut self, _name: &str) {}

    fn step_finished(&mut self, _record: &StepRecord) {}

    fn step_disabled(&mut self, _name: &str) {}

    fn aborted(&mut self, _error: &FatalError) {}
}

/// Discards all events
#[derive(Debug, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {}

/// Colored, status-tagged lines on stdout (errors on stderr)
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn step_started(&mut self, name: &str) {
        println!(
            "{} {}",
            symbols::ARROW.if_supports_color(Stream::Stdout, |s| s.cyan()),
            name.if_supports_color(Stream::Stdout, |s| s.bold())
        );
    }

    fn step_finished(&mut self, record: &StepRecord) {
        let label = tag(&record.result);
        let label = match record.result {
            StepResult::Success { .. } => {
                label.if_supports_color(Stream::Stdout, |s| s.green()).to_string()
            }
            StepResult::Failure { .. } => {
                label.if_supports_color(Stream::Stdout, |s| s.red()).to_string()
            }
            StepResult::Skipped { .. } => {
                label.if_supports_color(Stream::Stdout, |s| s.yellow()).to_string()
            }
        };
        println!("{} {}", label, record.result.message());
        for backup in &record.backups {
            println!(
                "       backup: {}",
                backup
                    .backup
                    .display()
                    .if_supports_color(Stream::Stdout, |s| s.dimmed())
            );
        }
    }

    fn step_disabled(&mut self, name: &str) {
        println!(
            "{} {} (disabled)",
            symbols::SKIP.if_supports_color(Stream::Stdout, |s| s.dimmed()),
            name
        );
    }

    fn aborted(&mut self, error: &FatalError) {
        eprintln!(
            "{} {}",
            symbols::FAIL.if_supports_color(Stream::Stderr, |s| s.red()),
            error.if_supports_color(Stream::Stderr, |s| s.red())
        );
    }
}
