//! Shared fakes for integration tests.
//!
//! `FakeHostBuilder` wires a `Host` whose collaborators record every call into a
//! shared log instead of touching the machine. Files are written below a temp root.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use hostprep::config::Configuration;
use hostprep::error::{CommandError, StepError};
use hostprep::files::FileWriter;
use hostprep::firewall::{Direction, Firewall, Policy, PortRule};
use hostprep::host::Host;
use hostprep::jail::IntrusionPrevention;
use hostprep::kernel::KernelTunables;
use hostprep::package_manager::PackageManager;
use hostprep::privilege::PrivilegeCheck;
use hostprep::services::{ServiceManager, ServiceState};
use hostprep::step::{Step, StepResult};

pub type CallLog = Rc<RefCell<Vec<String>>>;

fn failed(program: &str) -> CommandError {
    CommandError::Failed {
        program: program.to_string(),
        code: 1,
        stderr: format!("{} simulated failure", program),
    }
}

// =============================================================================
// Collaborator fakes
// =============================================================================

struct FakePrivilege(bool);

impl PrivilegeCheck for FakePrivilege {
    fn is_privileged(&self) -> bool {
        self.0
    }
}

struct FakePackages {
    calls: CallLog,
    fail_update: bool,
    fail_upgrade: bool,
    fail_install: bool,
    installed: HashSet<String>,
}

impl PackageManager for FakePackages {
    fn refresh_index(&self) -> Result<(), CommandError> {
        self.calls.borrow_mut().push("apt update".to_string());
        if self.fail_update { Err(failed("apt-get")) } else { Ok(()) }
    }

    fn upgrade(&self) -> Result<(), CommandError> {
        self.calls.borrow_mut().push("apt upgrade".to_string());
        if self.fail_upgrade { Err(failed("apt-get")) } else { Ok(()) }
    }

    fn install(&self, packages: &[String]) -> Result<(), CommandError> {
        self.calls
            .borrow_mut()
            .push(format!("apt install {}", packages.join(" ")));
        if self.fail_install { Err(failed("apt-get")) } else { Ok(()) }
    }

    fn remove_unused(&self) -> Result<(), CommandError> {
        self.calls.borrow_mut().push("apt autoremove".to_string());
        Ok(())
    }

    fn is_installed(&self, package: &str) -> bool {
        self.installed.contains(package)
    }
}

struct FakeFirewall {
    calls: CallLog,
    present: bool,
    fail_enable: bool,
    rules: Rc<RefCell<Vec<String>>>,
}

impl Firewall for FakeFirewall {
    fn is_present(&self) -> bool {
        self.present
    }

    fn reset(&self) -> Result<(), CommandError> {
        self.calls.borrow_mut().push("ufw reset".to_string());
        self.rules.borrow_mut().clear();
        Ok(())
    }

    fn set_default(&self, direction: Direction, policy: Policy) -> Result<(), CommandError> {
        self.calls
            .borrow_mut()
            .push(format!("ufw default {} {}", policy, direction));
        Ok(())
    }

    fn allow(&self, rule: PortRule) -> Result<(), CommandError> {
        self.calls.borrow_mut().push(format!("ufw allow {}", rule));
        self.rules.borrow_mut().push(rule.to_string());
        Ok(())
    }

    fn enable(&self) -> Result<(), CommandError> {
        self.calls.borrow_mut().push("ufw enable".to_string());
        if self.fail_enable { Err(failed("ufw")) } else { Ok(()) }
    }
}

struct FakeServices {
    calls: CallLog,
    active: Rc<RefCell<HashSet<String>>>,
    failing: HashSet<String>,
}

impl ServiceManager for FakeServices {
    fn enable_now(&self, unit: &str) -> Result<ServiceState, CommandError> {
        self.calls.borrow_mut().push(format!("systemctl enable --now {}", unit));
        if self.failing.contains(unit) {
            return Err(failed("systemctl"));
        }
        if self.active.borrow_mut().insert(unit.to_string()) {
            Ok(ServiceState::Started)
        } else {
            Ok(ServiceState::AlreadyActive)
        }
    }

    fn restart(&self, unit: &str) -> Result<(), CommandError> {
        self.calls.borrow_mut().push(format!("systemctl restart {}", unit));
        if self.failing.contains(unit) { Err(failed("systemctl")) } else { Ok(()) }
    }
}

struct FakeKernel {
    calls: CallLog,
    fail: bool,
}

impl KernelTunables for FakeKernel {
    fn reload(&self) -> Result<(), CommandError> {
        self.calls.borrow_mut().push("sysctl --system".to_string());
        if self.fail { Err(failed("sysctl")) } else { Ok(()) }
    }
}

struct FakeJail {
    calls: CallLog,
    present: bool,
}

impl IntrusionPrevention for FakeJail {
    fn is_present(&self) -> bool {
        self.present
    }

    fn reload(&self) -> Result<(), CommandError> {
        self.calls.borrow_mut().push("fail2ban reload".to_string());
        Ok(())
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Handles for inspecting what the fakes saw
#[derive(Clone)]
pub struct Fakes {
    pub calls: CallLog,
    pub firewall_rules: Rc<RefCell<Vec<String>>>,
    pub active_units: Rc<RefCell<HashSet<String>>>,
}

impl Fakes {
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.calls.borrow().iter().any(|c| c.starts_with(prefix))
    }

    pub fn rules(&self) -> Vec<String> {
        self.firewall_rules.borrow().clone()
    }
}

/// Healthy host with every tool present unless told otherwise
pub struct FakeHostBuilder {
    pub privileged: bool,
    pub fail_update: bool,
    pub fail_upgrade: bool,
    pub fail_install: bool,
    pub fail_sysctl: bool,
    pub ufw_present: bool,
    pub fail_ufw_enable: bool,
    pub fail2ban_present: bool,
    pub unattended_installed: bool,
    pub failing_units: Vec<String>,
    pub active_units: Vec<String>,
}

impl Default for FakeHostBuilder {
    fn default() -> Self {
        Self {
            privileged: true,
            fail_update: false,
            fail_upgrade: false,
            fail_install: false,
            fail_sysctl: false,
            ufw_present: true,
            fail_ufw_enable: false,
            fail2ban_present: true,
            unattended_installed: true,
            failing_units: Vec::new(),
            active_units: Vec::new(),
        }
    }
}

impl FakeHostBuilder {
    pub fn build(self, root: &Path) -> (Host, Fakes) {
        let fakes = Fakes {
            calls: Rc::new(RefCell::new(Vec::new())),
            firewall_rules: Rc::new(RefCell::new(Vec::new())),
            active_units: Rc::new(RefCell::new(self.active_units.into_iter().collect())),
        };

        let mut installed = HashSet::new();
        if self.unattended_installed {
            installed.insert("unattended-upgrades".to_string());
        }

        let host = Host {
            privilege: Box::new(FakePrivilege(self.privileged)),
            packages: Box::new(FakePackages {
                calls: Rc::clone(&fakes.calls),
                fail_update: self.fail_update,
                fail_upgrade: self.fail_upgrade,
                fail_install: self.fail_install,
                installed,
            }),
            firewall: Box::new(FakeFirewall {
                calls: Rc::clone(&fakes.calls),
                present: self.ufw_present,
                fail_enable: self.fail_ufw_enable,
                rules: Rc::clone(&fakes.firewall_rules),
            }),
            services: Box::new(FakeServices {
                calls: Rc::clone(&fakes.calls),
                active: Rc::clone(&fakes.active_units),
                failing: self.failing_units.into_iter().collect(),
            }),
            kernel: Box::new(FakeKernel {
                calls: Rc::clone(&fakes.calls),
                fail: self.fail_sysctl,
            }),
            jail: Box::new(FakeJail {
                calls: Rc::clone(&fakes.calls),
                present: self.fail2ban_present,
            }),
            files: FileWriter::new(root),
        };

        (host, fakes)
    }
}

// =============================================================================
// Synthetic steps
// =============================================================================

/// Step with a fixed outcome that counts its executions and logs its name
pub struct ScriptedStep {
    pub name: &'static str,
    pub enabled: bool,
    pub fail: bool,
    pub runs: Rc<Cell<usize>>,
    pub order: CallLog,
}

impl ScriptedStep {
    pub fn new(name: &'static str, order: &CallLog) -> Self {
        Self {
            name,
            enabled: true,
            fail: false,
            runs: Rc::new(Cell::new(0)),
            order: Rc::clone(order),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

impl Step for ScriptedStep {
    fn name(&self) -> &'static str {
        self.name
    }

    fn should_run(&self, _config: &Configuration) -> bool {
        self.enabled
    }

    fn apply(&self, _config: &Configuration, _host: &Host) -> Result<StepResult, StepError> {
        self.runs.set(self.runs.get() + 1);
        self.order.borrow_mut().push(self.name.to_string());
        if self.fail {
            Err(StepError::Command(failed("scripted")))
        } else {
            Ok(StepResult::success(format!("{} done", self.name)))
        }
    }
}

// =============================================================================
// Filesystem helpers
// =============================================================================

/// Every regular file below `root`, keyed by relative path, with its contents
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, String> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, String>) {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() {
                walk(root, &path, out);
            } else if let Ok(text) = fs::read_to_string(&path) {
                let rel = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
                out.insert(rel, text);
            }
        }
    }

    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

/// Backup siblings of `file`
pub fn backups_of(file: &Path) -> Vec<PathBuf> {
    let Some(dir) = file.parent() else {
        return Vec::new();
    };
    let prefix = format!(
        "{}.bak.",
        file.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
    );
    let mut found: Vec<PathBuf> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_name().to_string_lossy().starts_with(&prefix))
                .map(|e| e.path())
                .collect()
        })
        .unwrap_or_default();
    found.sort();
    found
}

/// A configuration whose alias step targets `home`
pub fn config_with_home(home: &Path) -> Configuration {
    Configuration {
        alias_homes: vec![home.to_path_buf()],
        ..Configuration::default()
    }
}
