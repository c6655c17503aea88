//! Package installation and cleanup steps.
//!
//! # Failure Policy
//!
//! Both steps are **non-fatal**. A failed bulk install leaves some tools missing;
//! the steps that configure those tools then report Skipped instead of failing.
//! This is different from the initial index update and upgrade, which the
//! orchestrator treats as fatal preconditions.

use crate::config::Configuration;
use crate::error::StepError;
use crate::host::Host;
use crate::step::{Step, StepResult};

/// Install the configured tool list in one package-manager transaction
pub struct InstallCommonTools;

impl Step for InstallCommonTools {
    fn name(&self) -> &'static str {
        "Install common tools"
    }

    fn should_run(&self, config: &Configuration) -> bool {
        config.install_common_tools
    }

    fn apply(&self, config: &Configuration, host: &Host) -> Result<StepResult, StepError> {
        if config.common_tools.is_empty() {
            return Ok(StepResult::success("tool list is empty, nothing to install"));
        }

        host.packages.install(&config.common_tools)?;
        Ok(StepResult::success(format!(
            "installed {} package(s): {}",
            config.common_tools.len(),
            config.common_tools.join(", ")
        )))
    }
}

/// Remove dependencies nothing needs any more
pub struct RemoveUnusedPackages;

impl Step for RemoveUnusedPackages {
    fn name(&self) -> &'static str {
        "Remove unused packages"
    }

    fn should_run(&self, config: &Configuration) -> bool {
        config.remove_unused_packages
    }

    fn apply(&self, _config: &Configuration, host: &Host) -> Result<StepResult, StepError> {
        host.packages.remove_unused()?;
        Ok(StepResult::success("removed packages no longer required"))
    }
}
