//! Kernel tunable collaborator (sysctl).
//!
//! Tunables are persisted as drop-in files under `/etc/sysctl.d`; this interface only
//! asks the kernel to reload them.

use std::rc::Rc;

use crate::command_runner::{CommandRunner, Invocation};
use crate::error::CommandError;

pub trait KernelTunables {
    /// Apply every sysctl drop-in on the system
    fn reload(&self) -> Result<(), CommandError>;
}

/// `sysctl --system` backed implementation
pub struct Sysctl {
    runner: Rc<dyn CommandRunner>,
}

impl Sysctl {
    pub fn new(runner: Rc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl KernelTunables for Sysctl {
    fn reload(&self) -> Result<(), CommandError> {
        tracing::info!("Reloading kernel parameters");
        self.runner
            .run_checked(&Invocation::new("sysctl").arg("--system"))?;
        Ok(())
    }
}
