//! Run configuration: the flags and tunables every step reads.
//!
//! A [`Configuration`] is built once at startup (defaults, or a JSON file via
//! [`Configuration::load_from_file`]) and then passed by shared reference to the
//! orchestrator and every step. Nothing mutates it during a run.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::HostPrepError;

/// Location checked for a configuration file when none is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "/etc/hostprep/config.json";

/// Packages installed by the bulk-install step unless overridden
const DEFAULT_TOOLS: &[&str] = &[
    "curl",
    "wget",
    "git",
    "vim",
    "htop",
    "tmux",
    "tree",
    "unzip",
    "jq",
    "build-essential",
    "ca-certificates",
    "ufw",
    "fail2ban",
    "unattended-upgrades",
];

/// Workstation configuration for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    // Packages
    pub install_common_tools: bool,
    pub common_tools: Vec<String>,
    pub remove_unused_packages: bool,

    // Firewall
    pub enable_firewall: bool,
    pub allow_ssh: bool,
    pub ssh_port: u16,

    // Security services
    pub enable_unattended_upgrades: bool,
    pub enable_fail2ban: bool,

    // Kernel / network tuning
    pub tune_kernel: bool,
    pub swappiness: u8,
    pub vfs_cache_pressure: u32,
    pub tcp_congestion_control: String,

    // Journal
    pub cap_journal: bool,
    pub journal_max_use: String, // Size like "200M" - journald format

    // Services
    pub enable_services: bool,
    pub services: Vec<String>,

    // Shell customisation
    pub add_shell_aliases: bool,
    pub alias_homes: Vec<PathBuf>, // Empty = resolved at startup from the invoking user
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            install_common_tools: true,
            common_tools: DEFAULT_TOOLS.iter().map(|t| (*t).to_string()).collect(),
            remove_unused_packages: true,
            enable_firewall: true,
            allow_ssh: true,
            ssh_port: 22,
            enable_unattended_upgrades: true,
            enable_fail2ban: true,
            tune_kernel: true,
            swappiness: 10,
            vfs_cache_pressure: 50,
            tcp_congestion_control: "bbr".to_string(),
            cap_journal: true,
            journal_max_use: "200M".to_string(),
            enable_services: true,
            services: vec!["fstrim.timer".to_string()],
            add_shell_aliases: true,
            alias_homes: Vec::new(),
        }
    }
}

impl Configuration {
    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file.
    ///
    /// Missing keys take their default value; unknown keys are rejected so a
    /// misspelt option cannot silently fall back to its default.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Validate scalar ranges and formats
    pub fn validate(&self) -> std::result::Result<(), HostPrepError> {
        // The fail2ban jail uses the port even when the firewall does not allow it
        if self.ssh_port == 0 {
            return Err(HostPrepError::validation("ssh-port must be between 1 and 65535"));
        }

        // Kernels >= 5.8 accept up to 200
        if self.swappiness > 200 {
            return Err(HostPrepError::validation("swappiness must be between 0 and 200"));
        }

        let cc = self.tcp_congestion_control.trim();
        if cc.is_empty() {
            return Err(HostPrepError::validation("tcp-congestion-control must be specified"));
        }
        if !cc.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(HostPrepError::validation(format!(
                "tcp-congestion-control '{}' is not a valid algorithm name",
                cc
            )));
        }

        if !is_journal_size(&self.journal_max_use) {
            return Err(HostPrepError::validation(format!(
                "journal-max-use '{}' must look like 200M (digits with optional K, M, G or T)",
                self.journal_max_use
            )));
        }

        for tool in &self.common_tools {
            if !is_plain_name(tool) {
                return Err(HostPrepError::validation(format!(
                    "common-tools entry '{}' is not a valid package name",
                    tool
                )));
            }
        }

        for unit in &self.services {
            if !is_plain_name(unit) {
                return Err(HostPrepError::validation(format!(
                    "services entry '{}' is not a valid unit name",
                    unit
                )));
            }
        }

        if let Some(home) = self.alias_homes.iter().find(|h| !h.is_absolute()) {
            return Err(HostPrepError::validation(format!(
                "alias-homes entry {:?} must be an absolute path",
                home
            )));
        }

        Ok(())
    }

    /// Fill an empty `alias_homes` from `homes`. A configured list is kept as is.
    pub fn resolve_alias_homes(mut self, homes: impl FnOnce() -> Vec<PathBuf>) -> Self {
        if self.alias_homes.is_empty() {
            self.alias_homes = homes();
        }
        self
    }

    /// The congestion-control algorithm with surrounding whitespace removed
    pub fn congestion_control(&self) -> &str {
        self.tcp_congestion_control.trim()
    }
}

/// journald size syntax: digits, optionally followed by one of K/M/G/T
fn is_journal_size(value: &str) -> bool {
    let digits = value.trim_end_matches(['K', 'M', 'G', 'T']);
    // At most one suffix character
    value.len() - digits.len() <= 1
        && !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
}

/// Package and unit names are passed as argv entries: no whitespace, no leading dash
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('-') && !name.contains(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_is_valid() {
        let config = Configuration::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ssh_port, 22);
        assert_eq!(config.journal_max_use, "200M");
        assert!(config.common_tools.contains(&"ufw".to_string()));
    }

    #[test]
    fn test_save_and_load_json_config() {
        let mut config = Configuration::default();
        config.ssh_port = 2222;
        config.alias_homes = vec![PathBuf::from("/home/dev")];

        let file = NamedTempFile::new().unwrap();
        config.save_to_file(file.path()).unwrap();

        let loaded = Configuration::load_from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "allow-ssh": true, "ssh-port": 2222 }}"#).unwrap();

        let config = Configuration::load_from_file(file.path()).unwrap();
        assert_eq!(config.ssh_port, 2222);
        assert!(config.enable_firewall);
        assert_eq!(config.swappiness, 10);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "enable-firewal": false }}"#).unwrap();

        assert!(Configuration::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Configuration::load_from_file("/nonexistent/path/config.json");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_wrong_type_fails() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "ssh-port": "twenty-two" }}"#).unwrap();

        assert!(Configuration::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_validation_zero_port_rejected() {
        let config = Configuration {
            ssh_port: 0,
            ..Configuration::default()
        };
        assert!(config.validate().is_err());

        // Still rejected without SSH in the firewall: the jail would get port 0
        let config = Configuration {
            ssh_port: 0,
            allow_ssh: false,
            ..Configuration::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_swappiness_range() {
        let config = Configuration {
            swappiness: 201,
            ..Configuration::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_journal_size_formats() {
        for good in ["200M", "1G", "512", "64K", "2T"] {
            let config = Configuration {
                journal_max_use: good.to_string(),
                ..Configuration::default()
            };
            assert!(config.validate().is_ok(), "{} should be accepted", good);
        }

        for bad in ["", "M", "200MB", "2.5G", "200 M", "-1M"] {
            let config = Configuration {
                journal_max_use: bad.to_string(),
                ..Configuration::default()
            };
            assert!(config.validate().is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_validation_congestion_control_name() {
        let config = Configuration {
            tcp_congestion_control: "bbr; rm -rf /".to_string(),
            ..Configuration::default()
        };
        assert!(config.validate().is_err());

        let config = Configuration {
            tcp_congestion_control: " cubic ".to_string(),
            ..Configuration::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.congestion_control(), "cubic");
    }

    #[test]
    fn test_validation_rejects_option_like_package() {
        let config = Configuration {
            common_tools: vec!["git".to_string(), "--purge".to_string()],
            ..Configuration::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_alias_homes_only_when_empty() {
        let resolved = Configuration::default()
            .resolve_alias_homes(|| vec![PathBuf::from("/home/dev"), PathBuf::from("/root")]);
        assert_eq!(resolved.alias_homes.len(), 2);

        let configured = Configuration {
            alias_homes: vec![PathBuf::from("/srv/ops")],
            ..Configuration::default()
        }
        .resolve_alias_homes(|| vec![PathBuf::from("/home/dev")]);
        assert_eq!(configured.alias_homes, vec![PathBuf::from("/srv/ops")]);
    }

    #[test]
    fn test_validation_relative_alias_home() {
        let config = Configuration {
            alias_homes: vec![PathBuf::from("home/dev")],
            ..Configuration::default()
        };
        assert!(config.validate().is_err());
    }
}
