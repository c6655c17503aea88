//! Service manager collaborator (systemd).

use std::rc::Rc;

use crate::command_runner::{CommandRunner, Invocation};
use crate::error::CommandError;

/// Result of asking for a unit to be enabled and running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// The unit was already enabled and active; nothing was changed
    AlreadyActive,
    /// The unit was enabled and/or started by this call
    Started,
}

/// Operations hostprep needs from the init system.
pub trait ServiceManager {
    /// Enable `unit` at boot and start it now. Already enabled and running is success.
    fn enable_now(&self, unit: &str) -> Result<ServiceState, CommandError>;

    fn restart(&self, unit: &str) -> Result<(), CommandError>;
}

/// `systemctl` backed implementation
pub struct Systemctl {
    runner: Rc<dyn CommandRunner>,
}

impl Systemctl {
    pub fn new(runner: Rc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// `systemctl <query> --quiet <unit>` exits 0 when the answer is yes
    fn query(&self, query: &str, unit: &str) -> Result<bool, CommandError> {
        let output = self
            .runner
            .run(&Invocation::new("systemctl").args([query, "--quiet", unit]))?;
        Ok(output.success)
    }
}

impl ServiceManager for Systemctl {
    fn enable_now(&self, unit: &str) -> Result<ServiceState, CommandError> {
        if self.query("is-enabled", unit)? && self.query("is-active", unit)? {
            tracing::debug!("{} already enabled and active", unit);
            return Ok(ServiceState::AlreadyActive);
        }

        tracing::info!("Enabling and starting {}", unit);
        self.runner
            .run_checked(&Invocation::new("systemctl").args(["enable", "--now", unit]))?;
        Ok(ServiceState::Started)
    }

    fn restart(&self, unit: &str) -> Result<(), CommandError> {
        tracing::info!("Restarting {}", unit);
        self.runner
            .run_checked(&Invocation::new("systemctl").args(["restart", unit]))?;
        Ok(())
    }
}
