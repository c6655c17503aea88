//! Package manager collaborator (APT).
//!
//! All invocations run non-interactively: `DEBIAN_FRONTEND=noninteractive`, `-y`,
//! and dpkg told to keep existing config files on upgrade so a run never blocks on
//! a conffile prompt.

use std::rc::Rc;

use crate::command_runner::{CommandRunner, Invocation};
use crate::error::CommandError;

/// Operations hostprep needs from the package manager.
pub trait PackageManager {
    /// Refresh the package index (`apt-get update`)
    fn refresh_index(&self) -> Result<(), CommandError>;

    /// Upgrade installed packages
    fn upgrade(&self) -> Result<(), CommandError>;

    /// Install the given packages in one transaction
    fn install(&self, packages: &[String]) -> Result<(), CommandError>;

    /// Remove packages that were pulled in as dependencies and are no longer needed
    fn remove_unused(&self) -> Result<(), CommandError>;

    /// Returns true if `package` is currently installed
    fn is_installed(&self, package: &str) -> bool;
}

/// `apt-get` backed implementation
pub struct Apt {
    runner: Rc<dyn CommandRunner>,
}

impl Apt {
    pub fn new(runner: Rc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn apt_get(&self) -> Invocation {
        Invocation::new("apt-get").env("DEBIAN_FRONTEND", "noninteractive")
    }
}

impl PackageManager for Apt {
    fn refresh_index(&self) -> Result<(), CommandError> {
        tracing::info!("Refreshing package index");
        self.runner.run_checked(&self.apt_get().arg("update"))?;
        Ok(())
    }

    fn upgrade(&self) -> Result<(), CommandError> {
        tracing::info!("Upgrading installed packages");
        self.runner.run_checked(&self.apt_get().args([
            "-o",
            "Dpkg::Options::=--force-confdef",
            "-o",
            "Dpkg::Options::=--force-confold",
            "upgrade",
            "-y",
        ]))?;
        Ok(())
    }

    fn install(&self, packages: &[String]) -> Result<(), CommandError> {
        if packages.is_empty() {
            tracing::debug!("No packages requested, skipping apt-get install");
            return Ok(());
        }

        tracing::info!("Installing {} package(s): {}", packages.len(), packages.join(" "));
        self.runner.run_checked(
            &self
                .apt_get()
                .args(["install", "-y", "--no-install-recommends"])
                .args(packages.iter().cloned()),
        )?;
        Ok(())
    }

    fn remove_unused(&self) -> Result<(), CommandError> {
        tracing::info!("Removing unused packages");
        self.runner.run_checked(&self.apt_get().args(["autoremove", "-y"]))?;
        Ok(())
    }

    fn is_installed(&self, package: &str) -> bool {
        self.runner
            .run(&Invocation::new("dpkg-query").args(["-W", "-f=${Status}", package]))
            .map(|out| out.success && out.stdout.trim() == "install ok installed")
            .unwrap_or(false)
    }
}
