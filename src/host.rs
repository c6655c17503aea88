//! The host a run acts on: one implementation per external collaborator, plus the
//! file writer rooted at the host's filesystem root.

use std::rc::Rc;

use crate::command_runner::{CommandRunner, SystemRunner};
use crate::files::FileWriter;
use crate::firewall::{Firewall, Ufw};
use crate::jail::{Fail2ban, IntrusionPrevention};
use crate::kernel::{KernelTunables, Sysctl};
use crate::package_manager::{Apt, PackageManager};
use crate::privilege::{EffectiveUid, PrivilegeCheck};
use crate::services::{ServiceManager, Systemctl};

/// Collaborators shared by the orchestrator and every step
pub struct Host {
    pub privilege: Box<dyn PrivilegeCheck>,
    pub packages: Box<dyn PackageManager>,
    pub firewall: Box<dyn Firewall>,
    pub services: Box<dyn ServiceManager>,
    pub kernel: Box<dyn KernelTunables>,
    pub jail: Box<dyn IntrusionPrevention>,
    pub files: FileWriter,
}

impl Host {
    /// The real machine: apt, ufw, systemd, sysctl and fail2ban, files under `/`.
    pub fn system() -> Self {
        let runner: Rc<dyn CommandRunner> = Rc::new(SystemRunner);
        Self {
            privilege: Box::new(EffectiveUid),
            packages: Box::new(Apt::new(Rc::clone(&runner))),
            firewall: Box::new(Ufw::new(Rc::clone(&runner))),
            services: Box::new(Systemctl::new(Rc::clone(&runner))),
            kernel: Box::new(Sysctl::new(Rc::clone(&runner))),
            jail: Box::new(Fail2ban::new(runner)),
            files: FileWriter::new("/"),
        }
    }
}
