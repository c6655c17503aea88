//! File mutation primitives used by steps.
//!
//! All writes go through [`FileWriter`], which enforces write-after-backup and
//! idempotence:
//!
//! - [`FileWriter::replace`] swaps a whole file atomically (temp file + rename in the
//!   same directory), skipping the write entirely when the content already matches.
//! - [`FileWriter::append_block`] appends a marker-delimited block once; if the begin
//!   marker is already present the file is left alone.
//!
//! Every overwrite of an existing file is preceded by a [`BackupManager`] copy. The
//! records are kept until the orchestrator drains them with [`FileWriter::take_backups`].

use std::cell::RefCell;
use std::fs;
use std::io::{ErrorKind, Write};
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;

use crate::backup::{BackupManager, BackupRecord};
use crate::error::StepError;

/// What a file operation did to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChange {
    /// The file did not exist and was written
    Created,
    /// The file existed, was backed up, and now has new contents
    Updated,
    /// The file already had the desired contents (or marker); nothing was touched
    Unchanged,
}

impl FileChange {
    /// Short lowercase word for report details
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        }
    }
}

/// Root-relative file writer with backup bookkeeping
#[derive(Debug)]
pub struct FileWriter {
    root: PathBuf,
    backups: BackupManager,
    taken: RefCell<Vec<BackupRecord>>,
}

impl FileWriter {
    /// Create a writer whose system paths resolve below `root` (`/` in production)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            backups: BackupManager,
            taken: RefCell::new(Vec::new()),
        }
    }

    /// Filesystem root system paths are resolved against
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an absolute system path such as `/etc/sysctl.d/x.conf` below the root.
    pub fn system_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let mut resolved = self.root.clone();
        for component in path.as_ref().components() {
            if let Component::Normal(part) = component {
                resolved.push(part);
            }
        }
        resolved
    }

    /// Backups taken since the last call, oldest first
    pub fn take_backups(&self) -> Vec<BackupRecord> {
        self.taken.take()
    }

    /// Replace `path` with `contents`, backing up any previous version first.
    ///
    /// The previous contents are compared as bytes, so a file that is not valid
    /// UTF-8 is still replaced. A symlink is followed and its target is replaced.
    pub fn replace(&self, path: &Path, contents: &str, mode: u32) -> Result<FileChange, StepError> {
        let path = &resolve_link(path)?;
        let existing = read_optional(path)?;

        if existing.as_deref() == Some(contents.as_bytes()) {
            tracing::debug!("{:?} already up to date", path);
            return Ok(FileChange::Unchanged);
        }

        let change = match existing {
            Some(_) => {
                self.backup(path)?;
                FileChange::Updated
            }
            None => FileChange::Created,
        };

        let owner = owner_of(path).or_else(|| path.parent().and_then(owner_of));
        write_atomic(path, contents.as_bytes(), mode, owner)?;
        tracing::info!("Wrote {:?} ({})", path, change.as_str());

        Ok(change)
    }

    /// Append a block delimited by `begin`/`end` marker lines unless `begin` is
    /// already present in the file.
    ///
    /// A missing file is created owned by the owner of its parent directory, so a
    /// fresh `~/.bashrc` does not end up belonging to root. A symlinked file keeps
    /// its link; the block lands in the link target.
    pub fn append_block(
        &self,
        path: &Path,
        begin: &str,
        end: &str,
        body: &str,
    ) -> Result<FileChange, StepError> {
        let path = &resolve_link(path)?;
        let existing = read_optional(path)?;

        if existing
            .as_deref()
            .is_some_and(|bytes| contains_line(bytes, begin.as_bytes()))
        {
            tracing::debug!("Marker already present in {:?}", path);
            return Ok(FileChange::Unchanged);
        }

        let mut contents = existing.clone().unwrap_or_default();
        if !contents.is_empty() && !contents.ends_with(b"\n") {
            contents.push(b'\n');
        }
        if !contents.is_empty() {
            contents.push(b'\n');
        }
        contents.extend_from_slice(begin.as_bytes());
        contents.push(b'\n');
        contents.extend_from_slice(body.as_bytes());
        if !body.ends_with('\n') {
            contents.push(b'\n');
        }
        contents.extend_from_slice(end.as_bytes());
        contents.push(b'\n');

        let (change, mode, owner) = match existing {
            Some(_) => {
                self.backup(path)?;
                let meta = fs::metadata(path).map_err(|source| StepError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                (
                    FileChange::Updated,
                    meta.permissions().mode() & 0o7777,
                    Some((meta.uid(), meta.gid())),
                )
            }
            None => (
                FileChange::Created,
                0o644,
                path.parent().and_then(owner_of),
            ),
        };

        write_atomic(path, &contents, mode, owner)?;
        tracing::info!("Appended marked block to {:?} ({})", path, change.as_str());

        Ok(change)
    }

    fn backup(&self, path: &Path) -> Result<(), StepError> {
        if let Some(record) = self.backups.backup(path)? {
            self.taken.borrow_mut().push(record);
        }
        Ok(())
    }
}

/// The file a write to `path` should land in: `path` itself, or the final target
/// when `path` is a symlink (dangling links resolve to where they point).
fn resolve_link(path: &Path) -> Result<PathBuf, StepError> {
    let read_err = |source: std::io::Error| StepError::Read {
        path: path.to_path_buf(),
        source,
    };

    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {}
        Ok(_) => return Ok(path.to_path_buf()),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(path.to_path_buf()),
        Err(source) => return Err(read_err(source)),
    }

    let target = match fs::canonicalize(path) {
        Ok(target) => target,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let link = fs::read_link(path).map_err(read_err)?;
            match path.parent() {
                Some(parent) if link.is_relative() => parent.join(link),
                _ => link,
            }
        }
        Err(source) => return Err(read_err(source)),
    };

    tracing::debug!("{:?} is a symlink to {:?}", path, target);
    Ok(target)
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StepError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StepError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// True if some line of `bytes`, ignoring trailing whitespace, equals `wanted`
fn contains_line(bytes: &[u8], wanted: &[u8]) -> bool {
    bytes
        .split(|b| *b == b'\n')
        .any(|line| line.trim_ascii_end() == wanted)
}

fn owner_of(path: &Path) -> Option<(u32, u32)> {
    fs::metadata(path).ok().map(|meta| (meta.uid(), meta.gid()))
}

/// Write via a temp file in the target directory, then rename over the target.
fn write_atomic(
    path: &Path,
    contents: &[u8],
    mode: u32,
    owner: Option<(u32, u32)>,
) -> Result<(), StepError> {
    let write_err = |source: std::io::Error| StepError::Write {
        path: path.to_path_buf(),
        source,
    };

    let parent = path
        .parent()
        .ok_or_else(|| write_err(std::io::Error::new(ErrorKind::InvalidInput, "no parent directory")))?;
    fs::create_dir_all(parent).map_err(write_err)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(contents).map_err(write_err)?;
    tmp.as_file()
        .set_permissions(fs::Permissions::from_mode(mode))
        .map_err(write_err)?;
    if let Some((uid, gid)) = owner {
        std::os::unix::fs::fchown(tmp.as_file(), Some(uid), Some(gid)).map_err(write_err)?;
    }
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    Ok(())
}
