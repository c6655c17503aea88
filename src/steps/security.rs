//! Automatic security updates and SSH brute-force protection.
//!
//! Both steps configure tools that the bulk-install step normally provides. If the
//! tool is not on the host the step is Skipped, not failed.

use std::fmt::Write as _;

use crate::config::Configuration;
use crate::error::StepError;
use crate::host::Host;
use crate::services::ServiceState;
use crate::step::{Step, StepResult};
use crate::steps::MANAGED_HEADER;

/// APT periodic configuration consumed by unattended-upgrades
pub const AUTO_UPGRADES_PATH: &str = "/etc/apt/apt.conf.d/20auto-upgrades";

/// Local jail overrides; `jail.conf` itself is left to the package
pub const JAIL_LOCAL_PATH: &str = "/etc/fail2ban/jail.local";

// ============================================================================
// Unattended upgrades
// ============================================================================

pub struct UnattendedUpgrades;

impl UnattendedUpgrades {
    pub fn render() -> String {
        let mut text = String::from(MANAGED_HEADER);
        text.push_str("APT::Periodic::Update-Package-Lists \"1\";\n");
        text.push_str("APT::Periodic::Download-Upgradeable-Packages \"1\";\n");
        text.push_str("APT::Periodic::AutocleanInterval \"7\";\n");
        text.push_str("APT::Periodic::Unattended-Upgrade \"1\";\n");
        text
    }
}

impl Step for UnattendedUpgrades {
    fn name(&self) -> &'static str {
        "Enable unattended upgrades"
    }

    fn should_run(&self, config: &Configuration) -> bool {
        config.enable_unattended_upgrades
    }

    fn apply(&self, _config: &Configuration, host: &Host) -> Result<StepResult, StepError> {
        if !host.packages.is_installed("unattended-upgrades") {
            return Ok(StepResult::skipped("unattended-upgrades is not installed"));
        }

        let path = host.files.system_path(AUTO_UPGRADES_PATH);
        let change = host.files.replace(&path, &Self::render(), 0o644)?;
        host.services.enable_now("unattended-upgrades")?;

        Ok(StepResult::success(format!(
            "daily security upgrades on ({} {})",
            AUTO_UPGRADES_PATH,
            change.as_str()
        )))
    }
}

// ============================================================================
// fail2ban
// ============================================================================

pub struct Fail2banJail;

impl Fail2banJail {
    pub fn render(config: &Configuration) -> String {
        let mut text = String::from(MANAGED_HEADER);
        text.push_str("[DEFAULT]\n");
        text.push_str("bantime = 1h\n");
        text.push_str("findtime = 10m\n");
        text.push_str("maxretry = 5\n");
        text.push_str("backend = systemd\n");
        text.push('\n');
        text.push_str("[sshd]\n");
        text.push_str("enabled = true\n");
        // Writing to a String cannot fail
        let _ = writeln!(text, "port = {}", config.ssh_port);
        text
    }
}

impl Step for Fail2banJail {
    fn name(&self) -> &'static str {
        "Configure fail2ban"
    }

    fn should_run(&self, config: &Configuration) -> bool {
        config.enable_fail2ban
    }

    fn apply(&self, config: &Configuration, host: &Host) -> Result<StepResult, StepError> {
        if !host.jail.is_present() {
            return Ok(StepResult::skipped("fail2ban is not installed"));
        }

        let path = host.files.system_path(JAIL_LOCAL_PATH);
        let change = host.files.replace(&path, &Self::render(config), 0o644)?;

        // A freshly started daemon has already read the new jail
        if host.services.enable_now("fail2ban")? == ServiceState::AlreadyActive {
            host.jail.reload()?;
        }

        Ok(StepResult::success(format!(
            "sshd jail on port {} ({} {})",
            config.ssh_port,
            JAIL_LOCAL_PATH,
            change.as_str()
        )))
    }
}
