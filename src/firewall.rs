//! Firewall collaborator (UFW).

use std::fmt;
use std::rc::Rc;

use strum::{Display, EnumString};

use crate::command_runner::{CommandRunner, Invocation};
use crate::error::CommandError;

/// Traffic direction for a default policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// Default policy verb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Policy {
    Allow,
    Deny,
}

/// Transport protocol for an allow rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

/// One allowed port, rendered as `port/proto`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRule {
    pub port: u16,
    pub protocol: Protocol,
}

impl fmt::Display for PortRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.port, self.protocol)
    }
}

/// Operations hostprep needs from the firewall manager.
pub trait Firewall {
    /// Returns true if the firewall tool is installed
    fn is_present(&self) -> bool;

    /// Drop all rules and return to the tool's initial state
    fn reset(&self) -> Result<(), CommandError>;

    fn set_default(&self, direction: Direction, policy: Policy) -> Result<(), CommandError>;

    fn allow(&self, rule: PortRule) -> Result<(), CommandError>;

    /// Activate the firewall (and enable it at boot)
    fn enable(&self) -> Result<(), CommandError>;
}

/// `ufw` backed implementation
pub struct Ufw {
    runner: Rc<dyn CommandRunner>,
}

impl Ufw {
    pub fn new(runner: Rc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl Firewall for Ufw {
    fn is_present(&self) -> bool {
        self.runner.exists("ufw")
    }

    fn reset(&self) -> Result<(), CommandError> {
        self.runner
            .run_checked(&Invocation::new("ufw").args(["--force", "reset"]))?;
        Ok(())
    }

    fn set_default(&self, direction: Direction, policy: Policy) -> Result<(), CommandError> {
        self.runner.run_checked(
            &Invocation::new("ufw")
                .arg("default")
                .arg(policy.to_string())
                .arg(direction.to_string()),
        )?;
        Ok(())
    }

    fn allow(&self, rule: PortRule) -> Result<(), CommandError> {
        tracing::info!("Allowing {} through the firewall", rule);
        self.runner
            .run_checked(&Invocation::new("ufw").arg("allow").arg(rule.to_string()))?;
        Ok(())
    }

    fn enable(&self) -> Result<(), CommandError> {
        self.runner
            .run_checked(&Invocation::new("ufw").args(["--force", "enable"]))?;
        Ok(())
    }
}
