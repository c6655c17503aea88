//! Concrete configuration steps.
//!
//! [`default_steps`] is the fixed order a run applies them in. Order is the only
//! dependency mechanism: tools are installed before the steps that configure them,
//! and cleanup runs last.

pub mod aliases;
pub mod firewall;
pub mod packages;
pub mod security;
pub mod services;
pub mod tuning;

use crate::step::Step;

pub use aliases::ShellAliases;
pub use firewall::ConfigureFirewall;
pub use packages::{InstallCommonTools, RemoveUnusedPackages};
pub use security::{Fail2banJail, UnattendedUpgrades};
pub use services::EnableServices;
pub use tuning::{JournalCap, KernelTuning};

/// Header written at the top of every file hostprep owns
pub(crate) const MANAGED_HEADER: &str =
    "# Managed by hostprep. Manual edits are replaced on the next run.\n";

/// Every step, in the order a run applies them
pub fn default_steps() -> Vec<Box<dyn Step>> {
    vec![
        Box::new(InstallCommonTools),
        Box::new(ConfigureFirewall),
        Box::new(UnattendedUpgrades),
        Box::new(Fail2banJail),
        Box::new(KernelTuning),
        Box::new(JournalCap),
        Box::new(EnableServices),
        Box::new(ShellAliases),
        Box::new(RemoveUnusedPackages),
    ]
}
