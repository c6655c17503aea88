//! Intrusion-prevention collaborator (fail2ban).

use std::rc::Rc;

use crate::command_runner::{CommandRunner, Invocation};
use crate::error::CommandError;

pub trait IntrusionPrevention {
    /// Returns true if the intrusion-prevention tool is installed
    fn is_present(&self) -> bool;

    /// Make the running daemon pick up changed jail configuration
    fn reload(&self) -> Result<(), CommandError>;
}

/// `fail2ban-client` backed implementation
pub struct Fail2ban {
    runner: Rc<dyn CommandRunner>,
}

impl Fail2ban {
    pub fn new(runner: Rc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl IntrusionPrevention for Fail2ban {
    fn is_present(&self) -> bool {
        self.runner.exists("fail2ban-client")
    }

    fn reload(&self) -> Result<(), CommandError> {
        tracing::info!("Reloading fail2ban jails");
        self.runner
            .run_checked(&Invocation::new("fail2ban-client").arg("reload"))?;
        Ok(())
    }
}
