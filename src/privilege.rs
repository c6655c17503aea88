//! Privilege guard
//!
//! Every step writes below `/etc` or talks to privileged daemons, so the run
//! refuses to start unless the process has an effective UID of 0.

use std::path::PathBuf;

use nix::unistd::{Uid, User};

use crate::error::FatalError;

/// Source of the "are we administrator" answer.
pub trait PrivilegeCheck {
    /// Returns true if the process may perform administrative mutations
    fn is_privileged(&self) -> bool;
}

/// Production check backed by the effective UID
#[derive(Debug, Default, Clone, Copy)]
pub struct EffectiveUid;

impl PrivilegeCheck for EffectiveUid {
    fn is_privileged(&self) -> bool {
        nix::unistd::geteuid().is_root()
    }
}

/// Fails with [`FatalError::NotPrivileged`] unless `check` reports administrative rights.
pub fn check_privilege(check: &dyn PrivilegeCheck) -> Result<(), FatalError> {
    if check.is_privileged() {
        tracing::debug!("Privilege check passed");
        Ok(())
    } else {
        tracing::error!("Privilege check failed: effective UID is not 0");
        Err(FatalError::NotPrivileged)
    }
}

/// Home directories of the person running hostprep: the `SUDO_USER` account (if
/// any) followed by root's. Unknown accounts are ignored.
pub fn invoking_user_homes() -> Vec<PathBuf> {
    let mut homes = Vec::new();

    if let Ok(name) = std::env::var("SUDO_USER") {
        match User::from_name(&name) {
            Ok(Some(user)) => homes.push(user.dir),
            Ok(None) => tracing::warn!("SUDO_USER '{}' not found in passwd", name),
            Err(e) => tracing::warn!("Failed to look up SUDO_USER '{}': {}", name, e),
        }
    }

    match User::from_uid(Uid::from_raw(0)) {
        Ok(Some(root)) => homes.push(root.dir),
        _ => homes.push(PathBuf::from("/root")),
    }

    homes.dedup();
    homes
}
