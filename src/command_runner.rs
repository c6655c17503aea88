//! External command execution.
//!
//! Every collaborator (apt, ufw, systemctl, sysctl, fail2ban) shells out through a
//! [`CommandRunner`]. Production code uses [`SystemRunner`]; tests substitute a
//! recorder so command lines can be asserted without touching the host.
//!
//! Execution is synchronous: `run` returns only after the child has exited. There is
//! no timeout.

use std::process::{Command, Stdio};

use crate::error::CommandError;

/// A fully described command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// `program arg1 arg2 ...`, for logs and test assertions
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Output from a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output from the command.
    pub stdout: String,
    /// Standard error from the command.
    pub stderr: String,
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    /// Whether the command exited successfully (exit code 0).
    pub success: bool,
}

impl CommandOutput {
    /// Turn a non-zero exit into a [`CommandError::Failed`].
    pub fn ensure_success(self, program: &str) -> Result<Self, CommandError> {
        if self.success {
            Ok(self)
        } else {
            Err(CommandError::Failed {
                program: program.to_string(),
                code: self.exit_code.unwrap_or(-1),
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Seam between collaborators and the operating system.
pub trait CommandRunner {
    /// Run the command to completion and capture its output.
    ///
    /// A non-zero exit is NOT an error here; callers decide what an exit code means
    /// (e.g. `systemctl is-active` exits 3 for "inactive").
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, CommandError>;

    /// Returns true if `program` is found on `PATH`
    fn exists(&self, program: &str) -> bool;

    /// Run and require exit code 0
    fn run_checked(&self, invocation: &Invocation) -> Result<CommandOutput, CommandError> {
        self.run(invocation)?.ensure_success(&invocation.program)
    }
}

/// Runs real processes with `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, CommandError> {
        tracing::info!("Running: {}", invocation.command_line());

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }

        let output = cmd.output().map_err(|e| CommandError::Spawn {
            program: invocation.program.clone(),
            message: e.to_string(),
        })?;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
            success: output.status.success(),
        };

        if result.success {
            tracing::debug!("{} exited successfully", invocation.program);
        } else {
            tracing::debug!(
                "{} exited with code {}",
                invocation.program,
                result.exit_code.unwrap_or(-1)
            );
        }

        Ok(result)
    }

    fn exists(&self, program: &str) -> bool {
        // POSIX `command -v`; the name is passed as $1, never spliced into the script
        Command::new("sh")
            .args(["-c", "command -v \"$1\"", "sh", program])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}
