//! Backup manager
//!
//! Before a step overwrites a file that already exists, the current contents are
//! copied to a sibling named `<file>.bak.<YYYYMMDDHHMMSS>`. Backups are for manual
//! rollback only; nothing in hostprep reads them back.

use chrono::{DateTime, Local};
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::StepError;

/// Timestamp layout used in backup file names (second precision)
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// One pre-mutation copy of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    /// File that was about to be overwritten
    pub original: PathBuf,
    /// Where its previous contents were copied
    pub backup: PathBuf,
    /// When the copy was taken
    pub taken_at: DateTime<Local>,
}

/// Writes timestamped sibling copies of files about to be overwritten.
#[derive(Debug, Default, Clone, Copy)]
pub struct BackupManager;

impl BackupManager {
    /// Back up `path` if it exists.
    ///
    /// Returns `Ok(None)` when there is nothing to preserve. A copy failure is a
    /// [`StepError::Backup`], and the caller must not go on to overwrite `path`.
    pub fn backup(&self, path: &Path) -> Result<Option<BackupRecord>, StepError> {
        self.backup_at(path, Local::now())
    }

    /// Same as [`BackupManager::backup`] with an explicit timestamp.
    pub fn backup_at(
        &self,
        path: &Path,
        now: DateTime<Local>,
    ) -> Result<Option<BackupRecord>, StepError> {
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => {
                return Err(StepError::Backup {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(ErrorKind::InvalidInput, "target is a directory"),
                });
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No existing file at {:?}, nothing to back up", path);
                return Ok(None);
            }
            Err(source) => {
                return Err(StepError::Backup {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }

        let backup = free_backup_path(path, &now.format(BACKUP_TIMESTAMP_FORMAT).to_string());

        // fs::copy carries the permission bits over
        fs::copy(path, &backup).map_err(|source| StepError::Backup {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!("Backed up {:?} to {:?}", path, backup);

        Ok(Some(BackupRecord {
            original: path.to_path_buf(),
            backup,
            taken_at: now,
        }))
    }
}

/// `<path>.bak.<stamp>`, or `<path>.bak.<stamp>.N` if a backup already took that name
fn free_backup_path(path: &Path, stamp: &str) -> PathBuf {
    let mut base = OsString::from(path.as_os_str());
    base.push(".bak.");
    base.push(stamp);

    let candidate = PathBuf::from(&base);
    if !candidate.exists() {
        return candidate;
    }

    let mut n = 1u32;
    loop {
        let mut name = base.clone();
        name.push(format!(".{}", n));
        let candidate = PathBuf::from(name);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}
