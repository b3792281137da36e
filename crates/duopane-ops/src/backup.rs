//! In-memory backups captured before content is overwritten or deleted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use duopane_core::EngineConfig;
use filetime::FileTime;
use indexmap::IndexMap;

/// Contents captured for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backup {
    /// A regular file's bytes with the metadata restored alongside them.
    File {
        contents: Vec<u8>,
        permissions: fs::Permissions,
        modified: FileTime,
    },
    /// A symbolic link's target.
    Symlink(PathBuf),
}

impl Backup {
    /// Bytes this backup holds in memory.
    pub fn size(&self) -> u64 {
        match self {
            Self::File { contents, .. } => contents.len() as u64,
            Self::Symlink(target) => target.as_os_str().len() as u64,
        }
    }

    /// Write the backup back to `path`, replacing whatever is there.
    pub fn restore(&self, path: &Path) -> io::Result<()> {
        match self {
            Self::File {
                contents,
                permissions,
                modified,
            } => {
                if let Ok(existing) = fs::symlink_metadata(path)
                    && (existing.file_type().is_symlink() || existing.permissions().readonly())
                {
                    fs::remove_file(path)?;
                }
                fs::write(path, contents)?;
                filetime::set_file_mtime(path, *modified)?;
                fs::set_permissions(path, permissions.clone())
            }
            Self::Symlink(target) => {
                if fs::symlink_metadata(path).is_ok() {
                    fs::remove_file(path)?;
                }
                create_symlink(target, path)
            }
        }
    }
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symbolic links are not supported on this platform",
    ))
}

/// Why a file was not captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skipped {
    /// At or above the per-file cutoff.
    TooLarge,
    /// Capturing it would exceed the aggregate budget.
    OverBudget,
}

/// Backups keyed by path, in capture order.
#[derive(Debug, Default)]
pub struct BackupStore {
    entries: IndexMap<PathBuf, Backup>,
    bytes: u64,
}

impl BackupStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture `path` unconditionally. The first capture of a path wins.
    pub fn capture(&mut self, path: &Path) -> io::Result<()> {
        if self.entries.contains_key(path) {
            return Ok(());
        }
        let backup = read_backup(path)?;
        self.insert(path.to_path_buf(), backup);
        Ok(())
    }

    /// Capture `path` if it is under the configured cutoff and fits in the
    /// delete budget.
    pub fn capture_bounded(
        &mut self,
        path: &Path,
        config: &EngineConfig,
    ) -> io::Result<Result<(), Skipped>> {
        if self.entries.contains_key(path) {
            return Ok(Ok(()));
        }

        let metadata = fs::symlink_metadata(path)?;
        if !metadata.file_type().is_symlink() {
            let size = metadata.len();
            if !config.within_backup_limit(size) {
                return Ok(Err(Skipped::TooLarge));
            }
            if config.backup_budget.is_some_and(|budget| self.bytes + size > budget) {
                return Ok(Err(Skipped::OverBudget));
            }
        }

        let backup = read_backup(path)?;
        self.insert(path.to_path_buf(), backup);
        Ok(Ok(()))
    }

    fn insert(&mut self, path: PathBuf, backup: Backup) {
        self.bytes += backup.size();
        self.entries.insert(path, backup);
    }

    /// Whether `path` has a backup.
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of captured paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total bytes held.
    pub fn total_bytes(&self) -> u64 {
        self.bytes
    }

    /// Iterate over captured paths and backups, in capture order.
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &Backup)> {
        self.entries.iter()
    }
}

fn read_backup(path: &Path) -> io::Result<Backup> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.file_type().is_symlink() {
        Ok(Backup::Symlink(fs::read_link(path)?))
    } else {
        Ok(Backup::File {
            contents: fs::read(path)?,
            permissions: metadata.permissions(),
            modified: FileTime::from_last_modification_time(&metadata),
        })
    }
}
