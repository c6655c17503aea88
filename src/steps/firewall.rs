//! Firewall step.
//!
//! The rule set is rebuilt from scratch on every run (reset, defaults, allow rules,
//! enable), so repeated runs never accumulate duplicate rules.

use crate::config::Configuration;
use crate::error::{CommandError, StepError};
use crate::firewall::{Direction, Policy, PortRule, Protocol};
use crate::host::Host;
use crate::step::{Step, StepResult};

pub struct ConfigureFirewall;

impl ConfigureFirewall {
    /// Inbound rules the configuration asks for
    pub fn rules(config: &Configuration) -> Vec<PortRule> {
        let mut rules = Vec::new();
        if config.allow_ssh {
            rules.push(PortRule {
                port: config.ssh_port,
                protocol: Protocol::Tcp,
            });
        }
        rules
    }
}

impl Step for ConfigureFirewall {
    fn name(&self) -> &'static str {
        "Configure firewall"
    }

    fn should_run(&self, config: &Configuration) -> bool {
        config.enable_firewall
    }

    fn apply(&self, config: &Configuration, host: &Host) -> Result<StepResult, StepError> {
        if !host.firewall.is_present() {
            return Ok(StepResult::skipped("ufw is not installed"));
        }

        let rules = Self::rules(config);

        host.firewall.reset()?;

        // From here until enable() succeeds the host has no active firewall
        let reconfigure = || -> Result<(), CommandError> {
            host.firewall.set_default(Direction::Incoming, Policy::Deny)?;
            host.firewall.set_default(Direction::Outgoing, Policy::Allow)?;
            for rule in &rules {
                host.firewall.allow(*rule)?;
            }
            host.firewall.enable()
        };
        reconfigure().map_err(StepError::FirewallDisabled)?;

        let allowed = if rules.is_empty() {
            "no inbound ports allowed".to_string()
        } else {
            format!(
                "allowed {}",
                rules
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        };

        Ok(StepResult::success(format!(
            "deny incoming, allow outgoing, {}",
            allowed
        )))
    }
}
