//! hostprep library
//!
//! Step orchestration engine for workstation provisioning: a fixed, ordered list of
//! independently toggleable steps applied through narrow collaborator interfaces,
//! with write-after-backup file mutation and a fail-soft run report.

pub mod backup;
pub mod cli;
pub mod command_runner;
pub mod config;
pub mod error;
pub mod files;
pub mod firewall;
pub mod host;
pub mod jail;
pub mod kernel;
pub mod orchestrator;
pub mod package_manager;
pub mod privilege;
pub mod report;
pub mod services;
pub mod step;
pub mod steps;

// Re-export main types for convenience
pub use backup::{BackupManager, BackupRecord};
pub use config::Configuration;
pub use error::{CommandError, FatalError, HostPrepError, StepError};
pub use files::{FileChange, FileWriter};
pub use host::Host;
pub use orchestrator::{Orchestrator, RunState, RunTransitionError};
pub use report::{ConsoleSink, NullSink, ProgressSink, RunReport, StepRecord, render};
pub use step::{Step, StepResult};
pub use steps::default_steps;
