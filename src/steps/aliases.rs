//! Shell alias block.
//!
//! Appends a marker-delimited block of aliases to `~/.bashrc` for each configured
//! home directory. The begin marker makes the append happen at most once per file.

use crate::config::Configuration;
use crate::error::StepError;
use crate::files::FileChange;
use crate::host::Host;
use crate::step::{Step, StepResult};

pub const BEGIN_MARKER: &str = "# >>> hostprep aliases >>>";
pub const END_MARKER: &str = "# <<< hostprep aliases <<<";

const ALIASES: &str = "\
alias ll='ls -alF'
alias la='ls -A'
alias l='ls -CF'
alias ..='cd ..'
alias ...='cd ../..'
alias grep='grep --color=auto'
alias df='df -h'
alias du='du -h'
alias free='free -h'
alias ports='ss -tulpn'
alias update='sudo apt-get update && sudo apt-get upgrade'
";

pub struct ShellAliases;

impl Step for ShellAliases {
    fn name(&self) -> &'static str {
        "Add shell aliases"
    }

    fn should_run(&self, config: &Configuration) -> bool {
        config.add_shell_aliases
    }

    fn apply(&self, config: &Configuration, host: &Host) -> Result<StepResult, StepError> {
        if config.alias_homes.is_empty() {
            return Ok(StepResult::skipped("no home directories to update"));
        }

        let mut added = 0usize;
        let mut present = 0usize;
        let mut errors = Vec::new();

        for configured in &config.alias_homes {
            let home = host.files.system_path(configured);
            // Never create a home directory as a side effect
            if !home.is_dir() {
                errors.push(format!("{}: home directory does not exist", configured.display()));
                continue;
            }

            let rc = home.join(".bashrc");
            match host.files.append_block(&rc, BEGIN_MARKER, END_MARKER, ALIASES) {
                Ok(FileChange::Unchanged) => present += 1,
                Ok(FileChange::Created | FileChange::Updated) => added += 1,
                Err(e) => errors.push(format!("{}: {}", rc.display(), e)),
            }
        }

        if !errors.is_empty() {
            return Err(StepError::Partial {
                failed: errors.len(),
                total: config.alias_homes.len(),
                errors,
            });
        }

        Ok(StepResult::success(format!(
            "aliases added to {} .bashrc file(s), already present in {}",
            added, present
        )))
    }
}
