//! Run orchestration
//!
//! The [`Orchestrator`] is the single owner of run progress. It checks the fatal
//! preconditions, walks the fixed step list, and builds the [`RunReport`].
//!
//! # State Flow
//!
//! ```text
//! NotStarted
//!     ↓
//! Running ──(privilege / update / upgrade failure)──→ Aborted
//!     ↓
//! Completed   (after the last step, whatever the step outcomes)
//! ```
//!
//! # Failure Policy
//!
//! - Privilege check, package index update and system upgrade are **fatal**: the run
//!   is Aborted and no step executes. Later steps assume a fresh package index.
//! - Any step failure is **fail-soft**: it is recorded and the next step still runs.

use strum::Display;
use thiserror::Error;

use crate::config::Configuration;
use crate::error::FatalError;
use crate::host::Host;
use crate::privilege::check_privilege;
use crate::report::{NullSink, ProgressSink, RunReport, StepRecord};
use crate::step::{Step, StepResult};

/// Name of the report entry for the update/upgrade precondition
pub const PRECONDITION_ENTRY: &str = "Update package index and upgrade";

/// Orchestrator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RunState {
    NotStarted,
    Running,
    /// Every enabled step was attempted (terminal)
    Completed,
    /// A fatal precondition failed (terminal)
    Aborted,
}

impl RunState {
    /// Returns true if this is a terminal state (Completed or Aborted)
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }

    /// Returns true if `self -> target` is a legal transition
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::NotStarted, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Aborted)
        )
    }
}

/// Errors that can occur during state transitions
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTransitionError {
    /// Attempted to move out of Completed or Aborted (an orchestrator runs once)
    #[error("Cannot transition from terminal state {from}")]
    FromTerminalState { from: RunState },

    /// Any other transition the state flow does not allow
    #[error("Invalid transition from {from} to {to}")]
    Invalid { from: RunState, to: RunState },
}

/// Executes steps against a host, in order, exactly once.
pub struct Orchestrator<'a> {
    host: &'a Host,
    sink: Box<dyn ProgressSink + 'a>,
    state: RunState,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator that reports progress nowhere
    pub fn new(host: &'a Host) -> Self {
        Self::with_sink(host, Box::new(NullSink))
    }

    pub fn with_sink(host: &'a Host, sink: Box<dyn ProgressSink + 'a>) -> Self {
        Self {
            host,
            sink,
            state: RunState::NotStarted,
        }
    }

    /// Returns the current state
    #[inline]
    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition_to(&mut self, target: RunState) -> Result<(), RunTransitionError> {
        if self.state.is_terminal() {
            return Err(RunTransitionError::FromTerminalState { from: self.state });
        }
        if !self.state.can_transition_to(target) {
            return Err(RunTransitionError::Invalid {
                from: self.state,
                to: target,
            });
        }

        tracing::debug!("Run state {} -> {}", self.state, target);
        self.state = target;
        Ok(())
    }

    /// Run the preconditions and then every enabled step in list order.
    ///
    /// # Errors
    ///
    /// Only `RunTransitionError` when this orchestrator has already run. Precondition
    /// and step failures are reported inside the returned [`RunReport`].
    pub fn run(
        &mut self,
        config: &Configuration,
        steps: &[Box<dyn Step>],
    ) -> Result<RunReport, RunTransitionError> {
        self.transition_to(RunState::Running)?;
        let mut report = RunReport::new();

        if let Err(fatal) = self.preconditions(&mut report) {
            return self.abort(report, fatal);
        }

        for step in steps {
            let name = step.name();

            if !step.should_run(config) {
                tracing::info!("Step '{}' disabled by configuration", name);
                self.sink.step_disabled(name);
                report.disabled.push(name.to_string());
                continue;
            }

            tracing::info!("Running step '{}'", name);
            self.sink.step_started(name);

            let result = step.execute(config, self.host);
            match &result {
                StepResult::Success { .. } => tracing::info!("Step '{}' succeeded", name),
                StepResult::Skipped { reason } => {
                    tracing::info!("Step '{}' skipped: {}", name, reason)
                }
                StepResult::Failure { reason } => {
                    tracing::warn!("Step '{}' failed, continuing: {}", name, reason)
                }
            }

            let backups = self.host.files.take_backups();
            self.record(
                &mut report,
                StepRecord {
                    name: name.to_string(),
                    result,
                    backups,
                },
            );
        }

        self.transition_to(RunState::Completed)?;
        report.state = self.state;
        tracing::info!(
            "Run completed: {} succeeded, {} failed, {} skipped",
            report.succeeded(),
            report.failed(),
            report.skipped()
        );
        Ok(report)
    }

    fn preconditions(&mut self, report: &mut RunReport) -> Result<(), FatalError> {
        check_privilege(self.host.privilege.as_ref())?;

        self.sink.step_started(PRECONDITION_ENTRY);
        let outcome = self
            .host
            .packages
            .refresh_index()
            .map_err(FatalError::IndexUpdate)
            .and_then(|()| self.host.packages.upgrade().map_err(FatalError::Upgrade));

        let result = match &outcome {
            Ok(()) => StepResult::success("package index refreshed, installed packages upgraded"),
            Err(e) => StepResult::failure(e.to_string()),
        };
        self.record(
            report,
            StepRecord {
                name: PRECONDITION_ENTRY.to_string(),
                result,
                backups: Vec::new(),
            },
        );

        outcome
    }

    fn record(&mut self, report: &mut RunReport, record: StepRecord) {
        self.sink.step_finished(&record);
        report.entries.push(record);
    }

    fn abort(
        &mut self,
        mut report: RunReport,
        fatal: FatalError,
    ) -> Result<RunReport, RunTransitionError> {
        tracing::error!("Aborting run: {}", fatal);
        self.sink.aborted(&fatal);
        self.transition_to(RunState::Aborted)?;
        report.state = self.state;
        report.fatal = Some(fatal);
        Ok(report)
    }
}
