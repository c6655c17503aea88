//! The step abstraction.
//!
//! A step is one independently toggleable configuration change. The orchestrator
//! only ever talks to steps through [`Step`]: it asks [`Step::should_run`], and if
//! that is true calls [`Step::execute`] exactly once.

use std::fmt;

use crate::config::Configuration;
use crate::error::StepError;
use crate::host::Host;

/// Outcome of one executed step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    /// The change was applied (or was already in place). `detail` names what was done.
    Success { detail: String },
    /// The change could not be applied
    Failure { reason: String },
    /// A prerequisite tool is absent; not an error
    Skipped { reason: String },
}

impl StepResult {
    pub fn success(detail: impl Into<String>) -> Self {
        Self::Success {
            detail: detail.into(),
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    #[inline]
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// The detail or reason text
    pub fn message(&self) -> &str {
        match self {
            Self::Success { detail } => detail,
            Self::Failure { reason } | Self::Skipped { reason } => reason,
        }
    }
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { detail } => write!(f, "success: {}", detail),
            Self::Failure { reason } => write!(f, "failed: {}", reason),
            Self::Skipped { reason } => write!(f, "skipped: {}", reason),
        }
    }
}

/// One configuration change.
///
/// # Contract
///
/// - `apply` is only called when `should_run` returned true for the same configuration.
/// - `apply` must be idempotent: running it again on an already configured host must
///   not duplicate content or corrupt state.
/// - Any file overwritten by `apply` goes through `host.files`, which backs it up first.
pub trait Step {
    /// Unique, human-readable step name
    fn name(&self) -> &'static str;

    /// Enablement predicate derived from the configuration
    fn should_run(&self, config: &Configuration) -> bool;

    /// Perform the change. Errors become [`StepResult::Failure`] in [`Step::execute`].
    fn apply(&self, config: &Configuration, host: &Host) -> Result<StepResult, StepError>;

    /// Run the step, converting any error into a recorded failure
    fn execute(&self, config: &Configuration, host: &Host) -> StepResult {
        match self.apply(config, host) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Step '{}' failed: {}", self.name(), e);
                StepResult::failure(e.to_string())
            }
        }
    }
}
