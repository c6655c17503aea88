//! Kernel/network tuning and journal size cap.
//!
//! Both write a drop-in file owned entirely by hostprep and then ask the owning
//! subsystem to reload. The reload runs even when the file is unchanged so a run
//! that previously wrote the file but failed to reload converges.

use std::fmt::Write as _;

use crate::config::Configuration;
use crate::error::StepError;
use crate::host::Host;
use crate::step::{Step, StepResult};
use crate::steps::MANAGED_HEADER;

pub const SYSCTL_DROPIN_PATH: &str = "/etc/sysctl.d/99-workstation.conf";

pub const JOURNALD_DROPIN_PATH: &str = "/etc/systemd/journald.conf.d/99-size-cap.conf";

// ============================================================================
// sysctl
// ============================================================================

pub struct KernelTuning;

impl KernelTuning {
    pub fn render(config: &Configuration) -> String {
        let mut text = String::from(MANAGED_HEADER);
        // Writing to a String cannot fail
        let _ = writeln!(text, "vm.swappiness = {}", config.swappiness);
        let _ = writeln!(text, "vm.vfs_cache_pressure = {}", config.vfs_cache_pressure);
        // BBR is designed to pair with the fq packet scheduler
        if config.congestion_control() == "bbr" {
            text.push_str("net.core.default_qdisc = fq\n");
        }
        let _ = writeln!(
            text,
            "net.ipv4.tcp_congestion_control = {}",
            config.congestion_control()
        );
        text
    }
}

impl Step for KernelTuning {
    fn name(&self) -> &'static str {
        "Tune kernel parameters"
    }

    fn should_run(&self, config: &Configuration) -> bool {
        config.tune_kernel
    }

    fn apply(&self, config: &Configuration, host: &Host) -> Result<StepResult, StepError> {
        let path = host.files.system_path(SYSCTL_DROPIN_PATH);
        let change = host.files.replace(&path, &Self::render(config), 0o644)?;
        host.kernel.reload()?;

        Ok(StepResult::success(format!(
            "swappiness={}, vfs_cache_pressure={}, congestion control={} ({} {})",
            config.swappiness,
            config.vfs_cache_pressure,
            config.congestion_control(),
            SYSCTL_DROPIN_PATH,
            change.as_str()
        )))
    }
}

// ============================================================================
// journald
// ============================================================================

pub struct JournalCap;

impl JournalCap {
    pub fn render(config: &Configuration) -> String {
        let mut text = String::from(MANAGED_HEADER);
        text.push_str("[Journal]\n");
        let _ = writeln!(text, "SystemMaxUse={}", config.journal_max_use);
        text
    }
}

impl Step for JournalCap {
    fn name(&self) -> &'static str {
        "Cap journal size"
    }

    fn should_run(&self, config: &Configuration) -> bool {
        config.cap_journal
    }

    fn apply(&self, config: &Configuration, host: &Host) -> Result<StepResult, StepError> {
        let path = host.files.system_path(JOURNALD_DROPIN_PATH);
        let change = host.files.replace(&path, &Self::render(config), 0o644)?;
        host.services.restart("systemd-journald")?;

        Ok(StepResult::success(format!(
            "journal capped at {} ({} {})",
            config.journal_max_use,
            JOURNALD_DROPIN_PATH,
            change.as_str()
        )))
    }
}
