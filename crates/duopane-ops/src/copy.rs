//! Copy files and folders, keeping what undo needs to reverse it.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use duopane_core::{OpError, ValidationError};

use crate::backup::BackupStore;
use crate::context::OperationContext;
use crate::force_delete::{force_remove, force_remove_tree};
use crate::fs_util::{
    copy_file_preserving, count_files, display_name, is_real_dir, is_within, is_writable,
    path_exists,
};
use crate::naming::copy_target_path;
use crate::operation::{Lifecycle, UndoOutcome};
use crate::progress::{OperationType, status};

/// Copies each source into `destination`.
///
/// Without the copy suffix, existing files at the target are overwritten
/// after their contents are backed up, and existing folders are merged into.
/// With it, every top-level source gets a fresh " - Copy" name.
///
/// If the copy fails or is cancelled, overwritten files get their original
/// contents back before the error is returned. New files stay.
#[derive(Debug)]
pub struct CopyOperation {
    sources: Vec<PathBuf>,
    destination: PathBuf,
    add_copy_suffix: bool,
    /// Top-level source to the target it was copied to.
    copied: IndexMap<PathBuf, PathBuf>,
    /// Files that did not exist before the copy.
    created_files: Vec<PathBuf>,
    /// Folders that did not exist before the copy, parents first.
    created_dirs: Vec<PathBuf>,
    /// Original contents of overwritten files.
    backups: BackupStore,
    total_files: usize,
    processed_files: usize,
}

impl CopyOperation {
    /// Create a copy of `sources` into `destination`.
    pub fn new(sources: Vec<PathBuf>, destination: PathBuf, add_copy_suffix: bool) -> Self {
        Self {
            sources,
            destination,
            add_copy_suffix,
            copied: IndexMap::new(),
            created_files: Vec::new(),
            created_dirs: Vec::new(),
            backups: BackupStore::new(),
            total_files: 0,
            processed_files: 0,
        }
    }

    /// Whether top-level targets get the copy suffix.
    pub fn adds_copy_suffix(&self) -> bool {
        self.add_copy_suffix
    }

    /// The target chosen for each top-level source, in copy order.
    pub fn copied(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.copied.iter().map(|(s, t)| (s.as_path(), t.as_path()))
    }

    /// Files overwritten by the copy whose original contents are held.
    pub fn backups(&self) -> &BackupStore {
        &self.backups
    }

    /// Files copied so far.
    pub fn processed_files(&self) -> usize {
        self.processed_files
    }

    fn target_for(&self, source: &Path, ctx: &OperationContext) -> Option<PathBuf> {
        let name = source.file_name()?;
        if self.add_copy_suffix {
            let config = ctx.config();
            Some(copy_target_path(
                &self.destination,
                source,
                &config.copy_suffix,
                config.max_suffix_attempts,
            ))
        } else {
            Some(self.destination.join(name))
        }
    }

    fn copy_tree(
        &mut self,
        source: &Path,
        target: &Path,
        ctx: &OperationContext,
    ) -> Result<(), OpError> {
        for entry in WalkDir::new(source).follow_links(false).sort_by_file_name() {
            ctx.check_cancelled()?;

            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(source).to_path_buf();
                OpError::io(path, io::Error::from(e))
            })?;
            let relative = entry
                .path()
                .strip_prefix(source)
                .map_err(|e| OpError::internal(e.to_string()))?;
            let dest = target.join(relative);

            if entry.file_type().is_dir() {
                if !is_real_dir(&dest) {
                    fs::create_dir(&dest).map_err(|e| OpError::io(&dest, e))?;
                    self.created_dirs.push(dest);
                }
            } else {
                self.copy_file(entry.path(), &dest, ctx)?;
            }
        }
        Ok(())
    }

    fn copy_file(
        &mut self,
        source: &Path,
        target: &Path,
        ctx: &OperationContext,
    ) -> Result<(), OpError> {
        let overwriting = path_exists(target) && !is_real_dir(target);
        if overwriting {
            self.backups
                .capture(target)
                .map_err(|e| OpError::io(target, e))?;
        }

        replace_with_copy(source, target)?;

        if overwriting {
            debug!("Backed up and replaced {}", target.display());
        } else {
            self.created_files.push(target.to_path_buf());
        }

        self.processed_files += 1;
        ctx.reporter()
            .progress(self.processed_files, self.total_files, &display_name(source));
        Ok(())
    }

    fn copy_sources(&mut self, ctx: &OperationContext) -> Result<(), OpError> {
        for source in self.sources.clone() {
            ctx.check_cancelled()?;

            let Some(target) = self.target_for(&source, ctx) else {
                continue;
            };
            if target == source {
                debug!("Skipping copy of {} onto itself", source.display());
                continue;
            }
            self.copied.insert(source.clone(), target.clone());

            if is_real_dir(&source) {
                self.copy_tree(&source, &target, ctx)?;
            } else {
                self.copy_file(&source, &target, ctx)?;
            }
        }
        Ok(())
    }

    fn restore_overwritten(&self) {
        for (path, backup) in self.backups.iter() {
            match backup.restore(path) {
                Ok(()) => debug!("Put back {} after failed copy", path.display()),
                Err(e) => warn!("Could not put back {} after failed copy: {e}", path.display()),
            }
        }
    }
}

/// Copy `source` to a hidden sibling of `target`, then rename it into place.
///
/// Whatever is at `target` stays untouched until the new bytes are complete.
fn replace_with_copy(source: &Path, target: &Path) -> Result<(), OpError> {
    let staging = staging_path(target);

    let result = copy_file_preserving(source, &staging)
        .map_err(|e| OpError::io(source, e))
        .and_then(|_| swap_into_place(&staging, target));

    if result.is_err()
        && path_exists(&staging)
        && let Err(e) = force_remove(&staging)
    {
        warn!("Could not remove {}: {e}", staging.display());
    }
    result
}

fn swap_into_place(staging: &Path, target: &Path) -> Result<(), OpError> {
    match fs::rename(staging, target) {
        Ok(()) => Ok(()),
        Err(e) if path_exists(target) && !is_real_dir(target) => {
            debug!("Rename over {} failed ({e}), removing it first", target.display());
            force_remove(target).map_err(|e| OpError::io(target, e))?;
            fs::rename(staging, target).map_err(|e| OpError::io(target, e))
        }
        Err(e) => Err(OpError::io(target, e)),
    }
}

fn staging_path(target: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(target.file_name().unwrap_or_default());
    name.push(format!(".{}.part", Uuid::new_v4().simple()));
    target.with_file_name(name)
}

impl Lifecycle for CopyOperation {
    fn operation_type(&self) -> OperationType {
        OperationType::Copy
    }

    fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    fn destination(&self) -> Option<&Path> {
        Some(&self.destination)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.sources.is_empty() {
            return Err(ValidationError::NoSources);
        }

        for source in &self.sources {
            if !path_exists(source) {
                return Err(ValidationError::SourceMissing(source.clone()));
            }
            if source.file_name().is_none() {
                return Err(ValidationError::InvalidName(source.display().to_string()));
            }
            if is_real_dir(source) && is_within(&self.destination, source) {
                return Err(ValidationError::IntoItself(source.clone()));
            }
        }

        if !path_exists(&self.destination) {
            return Err(ValidationError::DestinationMissing(self.destination.clone()));
        }
        if !self.destination.is_dir() {
            return Err(ValidationError::DestinationNotFolder(self.destination.clone()));
        }
        if !is_writable(&self.destination) {
            return Err(ValidationError::NoWriteAccess(self.destination.clone()));
        }

        Ok(())
    }

    fn prepare(&mut self, ctx: &OperationContext) {
        ctx.reporter().status(status::COUNTING);
        self.total_files = count_files(&self.sources).unwrap_or_else(|e| {
            debug!("Counting failed, using top-level total: {e}");
            self.sources.len()
        });
        debug!("Copy will process {} files", self.total_files);
    }

    fn perform(&mut self, ctx: &OperationContext) -> Result<(), OpError> {
        ctx.reporter().status(status::COPYING);

        let outcome = self.copy_sources(ctx);
        if outcome.is_err() {
            self.restore_overwritten();
        }
        outcome
    }

    fn undo(&mut self, _ctx: &OperationContext) -> Result<UndoOutcome, OpError> {
        let mut restored = 0;
        let mut first_error: Option<OpError> = None;
        let mut note = |path: &Path, result: io::Result<()>| match result {
            Ok(()) => restored += 1,
            Err(e) => {
                warn!("Undo of copy could not restore {}: {e}", path.display());
                first_error.get_or_insert_with(|| OpError::io(path, e));
            }
        };

        for file in &self.created_files {
            if path_exists(file) {
                note(file, force_remove(file));
            }
        }

        for dir in self.created_dirs.iter().rev() {
            if path_exists(dir) {
                note(dir, force_remove_tree(dir));
            }
        }

        for (path, backup) in self.backups.iter() {
            note(path, backup.restore(path));
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(UndoOutcome::complete(restored)),
        }
    }

    fn description(&self) -> String {
        match self.sources.as_slice() {
            [only] if self.add_copy_suffix => format!("Create and copy {}", display_name(only)),
            _ => format!(
                "Copy {} items to {}",
                self.sources.len(),
                self.destination.display()
            ),
        }
    }
}
