//! Error handling module for hostprep
//!
//! Three layers of failure exist and they never mix:
//!
//! - [`FatalError`]: a precondition failed, the run is aborted before further mutation.
//! - [`StepError`]: a single step failed, it is recorded and the run continues.
//! - [`CommandError`]: an external tool could not be started or exited non-zero.
//!
//! [`HostPrepError`] covers everything outside a run (configuration loading, validation).

use std::path::PathBuf;
use thiserror::Error;

/// Crate-level error for work done outside the orchestrated run
#[derive(Error, Debug)]
pub enum HostPrepError {
    /// IO errors (reading or writing configuration files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors (loading, parsing)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors (out-of-range or malformed option values)
    #[error("Validation error: {0}")]
    Validation(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for hostprep operations
pub type Result<T> = std::result::Result<T, HostPrepError>;

impl HostPrepError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Failure of an external command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The program could not be spawned at all (missing binary, exec failure)
    #[error("failed to start {program}: {message}")]
    Spawn { program: String, message: String },

    /// The program ran and exited unsuccessfully
    #[error("{program} failed (exit code {code}): {stderr}")]
    Failed {
        program: String,
        code: i32,
        stderr: String,
    },
}

impl CommandError {
    /// Name of the program that failed
    pub fn program(&self) -> &str {
        match self {
            Self::Spawn { program, .. } | Self::Failed { program, .. } => program,
        }
    }
}

/// A run-aborting precondition failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FatalError {
    /// The process lacks administrative rights
    #[error("administrative privileges required (run as root or with sudo)")]
    NotPrivileged,

    /// Refreshing the package index failed
    #[error("package index update failed: {0}")]
    IndexUpdate(CommandError),

    /// Upgrading installed packages failed
    #[error("system upgrade failed: {0}")]
    Upgrade(CommandError),
}

/// A single step's failure. Recorded in the run report, never propagated further.
#[derive(Error, Debug)]
pub enum StepError {
    /// A collaborator command failed
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The pre-mutation backup could not be written; the target was left untouched
    #[error("backup of {path} failed: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the new file contents failed
    #[error("writing {path} failed: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the current file contents failed
    #[error("reading {path} failed: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The firewall was reset (and so deactivated) but could not be brought back up
    #[error("firewall left disabled after reset: {0}")]
    FirewallDisabled(#[source] CommandError),

    /// Some targets of a multi-target step failed
    #[error("{failed} of {total} failed: {}", .errors.join("; "))]
    Partial {
        failed: usize,
        total: usize,
        errors: Vec<String>,
    },
}
