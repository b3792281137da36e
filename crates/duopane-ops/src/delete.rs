//! Permanent delete with in-memory backups for undo.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use duopane_core::{OpError, ValidationError};

use crate::backup::{BackupStore, Skipped};
use crate::context::OperationContext;
use crate::force_delete::force_remove;
use crate::fs_util::{count_files, display_name, is_real_dir, is_writable, path_exists};
use crate::operation::{Lifecycle, UndoOutcome};
use crate::progress::{OperationType, status};

/// Deletes each source, recursively for folders.
///
/// Files below the configured size cutoff are read into memory first, while
/// the aggregate budget lasts. Anything else is gone for good and listed in
/// [`DeleteOperation::unrecoverable`].
#[derive(Debug)]
pub struct DeleteOperation {
    sources: Vec<PathBuf>,
    backups: BackupStore,
    /// Folders in discovery order, parents before children.
    deleted_dirs: Vec<PathBuf>,
    unrecoverable: Vec<PathBuf>,
    total_files: usize,
    processed_files: usize,
}

impl DeleteOperation {
    /// Create a delete of `sources`.
    pub fn new(sources: Vec<PathBuf>) -> Self {
        Self {
            sources,
            backups: BackupStore::new(),
            deleted_dirs: Vec::new(),
            unrecoverable: Vec::new(),
            total_files: 0,
            processed_files: 0,
        }
    }

    /// Files deleted without a backup.
    pub fn unrecoverable(&self) -> &[PathBuf] {
        &self.unrecoverable
    }

    /// Backed-up file contents.
    pub fn backups(&self) -> &BackupStore {
        &self.backups
    }

    fn delete_file(&mut self, path: &Path, ctx: &OperationContext) -> Result<(), OpError> {
        match self.backups.capture_bounded(path, ctx.config()) {
            Ok(Ok(())) => {}
            Ok(Err(Skipped::TooLarge)) => {
                warn!("Skipping backup for large file: {}", path.display());
                self.unrecoverable.push(path.to_path_buf());
            }
            Ok(Err(Skipped::OverBudget)) => {
                warn!("Backup budget exhausted, not backing up {}", path.display());
                self.unrecoverable.push(path.to_path_buf());
            }
            Err(e) => {
                warn!("Failed to back up {}: {e}", path.display());
                self.unrecoverable.push(path.to_path_buf());
            }
        }

        remove(path)?;

        self.processed_files += 1;
        ctx.reporter()
            .progress(self.processed_files, self.total_files, &display_name(path));
        Ok(())
    }

    fn delete_tree(&mut self, root: &Path, ctx: &OperationContext) -> Result<(), OpError> {
        let mut files = Vec::new();
        let mut dirs = Vec::new();

        for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
            ctx.check_cancelled()?;
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                OpError::io(path, io::Error::from(e))
            })?;
            if entry.file_type().is_dir() {
                dirs.push(entry.into_path());
            } else {
                files.push(entry.into_path());
            }
        }

        self.deleted_dirs.extend(dirs.iter().cloned());

        for file in &files {
            ctx.check_cancelled()?;
            self.delete_file(file, ctx)?;
        }

        for dir in dirs.iter().rev() {
            remove(dir)?;
        }

        debug!(
            "Deleted {} with {} files and {} folders",
            root.display(),
            files.len(),
            dirs.len()
        );
        Ok(())
    }
}

/// Forced delete, with exhausted permission retries reported as locked.
fn remove(path: &Path) -> Result<(), OpError> {
    force_remove(path).map_err(|e| {
        if e.kind() == io::ErrorKind::PermissionDenied {
            OpError::Locked {
                path: path.to_path_buf(),
                source: e,
            }
        } else {
            OpError::io(path, e)
        }
    })
}

impl Lifecycle for DeleteOperation {
    fn operation_type(&self) -> OperationType {
        OperationType::Delete
    }

    fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    fn destination(&self) -> Option<&Path> {
        None
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.sources.is_empty() {
            return Err(ValidationError::NoSources);
        }

        for source in &self.sources {
            if !path_exists(source) {
                return Err(ValidationError::SourceMissing(source.clone()));
            }
            if let Some(parent) = source.parent()
                && !parent.as_os_str().is_empty()
                && !is_writable(parent)
            {
                return Err(ValidationError::NoWriteAccess(source.clone()));
            }
        }

        Ok(())
    }

    fn prepare(&mut self, ctx: &OperationContext) {
        ctx.reporter().status(status::COUNTING);
        self.total_files = count_files(&self.sources).unwrap_or_else(|e| {
            debug!("Counting failed, using top-level total: {e}");
            self.sources.len()
        });
    }

    fn perform(&mut self, ctx: &OperationContext) -> Result<(), OpError> {
        ctx.reporter().status(status::DELETING);

        for source in self.sources.clone() {
            ctx.check_cancelled()?;
            if is_real_dir(&source) {
                self.delete_tree(&source, ctx)?;
            } else {
                self.delete_file(&source, ctx)?;
            }
        }

        Ok(())
    }

    fn undo(&mut self, ctx: &OperationContext) -> Result<UndoOutcome, OpError> {
        let reporter = ctx.reporter();
        reporter.status(status::RESTORING);

        let total = self.deleted_dirs.len() + self.backups.len();
        let mut restored = 0;

        for dir in &self.deleted_dirs {
            fs::create_dir_all(dir).map_err(|e| OpError::io(dir, e))?;
            restored += 1;
            reporter.progress(restored, total, &format!("Restoring folder {}", display_name(dir)));
        }

        for (path, backup) in self.backups.iter() {
            restored += 1;
            reporter.progress(restored, total, &format!("Restoring file {}", display_name(path)));

            if path_exists(path) {
                continue;
            }
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent).map_err(|e| OpError::io(parent, e))?;
            }
            backup.restore(path).map_err(|e| OpError::io(path, e))?;
        }

        Ok(UndoOutcome {
            restored,
            unrecoverable: self.unrecoverable.clone(),
        })
    }

    fn description(&self) -> String {
        format!("Delete {} items", self.sources.len())
    }
}
