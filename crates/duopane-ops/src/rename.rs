//! Rename a single file or folder in place.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use duopane_core::{OpError, ValidationError};

use crate::context::OperationContext;
use crate::fs_util::{display_name, is_writable, path_exists};
use crate::operation::{Lifecycle, UndoOutcome};
use crate::progress::OperationType;

/// Renames `old_path` to `new_path`.
#[derive(Debug, Clone)]
pub struct RenameOperation {
    old_path: PathBuf,
    new_path: PathBuf,
    renamed: bool,
}

impl RenameOperation {
    /// Create a rename from `old_path` to `new_path`.
    pub fn new(old_path: PathBuf, new_path: PathBuf) -> Self {
        Self {
            old_path,
            new_path,
            renamed: false,
        }
    }

    /// The path before the rename.
    pub fn old_path(&self) -> &Path {
        &self.old_path
    }

    /// The path after the rename.
    pub fn new_path(&self) -> &Path {
        &self.new_path
    }
}

impl Lifecycle for RenameOperation {
    fn operation_type(&self) -> OperationType {
        OperationType::Rename
    }

    fn sources(&self) -> &[PathBuf] {
        std::slice::from_ref(&self.old_path)
    }

    fn destination(&self) -> Option<&Path> {
        self.new_path.parent()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let new_name = self
            .new_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        validate_filename(&new_name).map_err(ValidationError::InvalidName)?;

        if !path_exists(&self.old_path) {
            return Err(ValidationError::SourceMissing(self.old_path.clone()));
        }

        if path_exists(&self.new_path) && !is_case_only_rename(&self.old_path, &self.new_path) {
            return Err(ValidationError::NameTaken(new_name));
        }

        let parent = self
            .new_path
            .parent()
            .ok_or(ValidationError::ParentMissing)?;
        if !parent.is_dir() {
            return Err(ValidationError::ParentMissing);
        }
        if !is_writable(parent) {
            return Err(ValidationError::ParentReadOnly);
        }

        Ok(())
    }

    fn perform(&mut self, _ctx: &OperationContext) -> Result<(), OpError> {
        fs::rename(&self.old_path, &self.new_path).map_err(|e| OpError::io(&self.old_path, e))?;
        self.renamed = true;
        Ok(())
    }

    fn undo(&mut self, _ctx: &OperationContext) -> Result<UndoOutcome, OpError> {
        if !self.renamed {
            return Ok(UndoOutcome::default());
        }
        if !path_exists(&self.new_path) {
            return Err(OpError::NotFound {
                path: self.new_path.clone(),
            });
        }

        fs::rename(&self.new_path, &self.old_path).map_err(|e| OpError::io(&self.new_path, e))?;
        debug!(
            "Renamed {} back to {}",
            self.new_path.display(),
            self.old_path.display()
        );
        self.renamed = false;
        Ok(UndoOutcome::complete(1))
    }

    fn description(&self) -> String {
        format!(
            "Rename {} to {}",
            display_name(&self.old_path),
            display_name(&self.new_path)
        )
    }
}

/// Whether `new` differs from `old` only in letter case and names the same
/// directory entry (as on case-insensitive filesystems).
fn is_case_only_rename(old: &Path, new: &Path) -> bool {
    if old == new || old.parent() != new.parent() {
        return false;
    }
    let (Some(old_name), Some(new_name)) = (old.file_name(), new.file_name()) else {
        return false;
    };
    if !old_name
        .to_string_lossy()
        .eq_ignore_ascii_case(&new_name.to_string_lossy())
    {
        return false;
    }
    same_entry(old, new)
}

#[cfg(unix)]
fn same_entry(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (fs::symlink_metadata(a), fs::symlink_metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_entry(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a
            .to_string_lossy()
            .eq_ignore_ascii_case(&b.to_string_lossy()),
        _ => false,
    }
}

/// Validate a filename for cross-platform compatibility.
pub fn validate_filename(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Name cannot be empty".into());
    }

    if name == "." || name == ".." {
        return Err("'.' and '..' are reserved names".into());
    }

    if name.len() > 255 {
        return Err("Name is too long (max 255 bytes)".into());
    }

    for c in ['/', '\0'] {
        if name.contains(c) {
            return Err(format!("Name cannot contain '{}'", c.escape_default()));
        }
    }

    #[cfg(target_os = "windows")]
    {
        for c in ['\\', ':', '*', '?', '"', '<', '>', '|'] {
            if name.contains(c) {
                return Err(format!("Name cannot contain '{c}'"));
            }
        }

        const RESERVED: [&str; 22] = [
            "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7",
            "COM8", "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
        ];
        let upper = name.to_uppercase();
        let stem = upper.split('.').next().unwrap_or("");
        if RESERVED.contains(&stem) {
            return Err(format!("'{name}' is a reserved name"));
        }
    }

    if name.starts_with(' ') || name.ends_with(' ') {
        return Err("Name cannot start or end with spaces".into());
    }

    if name.ends_with('.') {
        return Err("Name cannot end with a dot".into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use duopane_core::EngineConfig;
    use tempfile::TempDir;

    #[test]
    fn test_validate_filename_valid() {
        assert!(validate_filename("test.txt").is_ok());
        assert!(validate_filename("my-file").is_ok());
        assert!(validate_filename(".hidden").is_ok());
        assert!(validate_filename("file with spaces").is_ok());
        assert!(validate_filename(&"a".repeat(255)).is_ok());
    }

    #[test]
    fn test_validate_filename_invalid() {
        assert!(validate_filename("").is_err());
        assert!(validate_filename("test/file").is_err());
        assert!(validate_filename("nul\0byte").is_err());
        assert!(validate_filename(".").is_err());
        assert!(validate_filename("..").is_err());
        assert!(validate_filename("file ").is_err());
        assert!(validate_filename(" file").is_err());
        assert!(validate_filename("file.").is_err());
        assert!(validate_filename(&"a".repeat(256)).is_err());
    }

    #[test]
    fn test_rename_and_undo() {
        let dir = TempDir::new().unwrap();
        let old = dir.path().join("old.txt");
        let new = dir.path().join("new.txt");
        fs::write(&old, b"content").unwrap();
        let ctx = OperationContext::detached(EngineConfig::default());

        let mut op = RenameOperation::new(old.clone(), new.clone());
        op.validate().unwrap();
        op.perform(&ctx).unwrap();
        assert!(!old.exists());
        assert_eq!(fs::read(&new).unwrap(), b"content");
        assert_eq!(op.destination(), Some(dir.path()));

        assert_eq!(op.undo(&ctx).unwrap(), UndoOutcome::complete(1));
        assert!(old.exists());
        assert!(!new.exists());
    }

    #[test]
    fn test_rename_validation() {
        let dir = TempDir::new().unwrap();
        let old = dir.path().join("a.txt");
        let taken = dir.path().join("b.txt");
        fs::write(&old, b"a").unwrap();
        fs::write(&taken, b"b").unwrap();

        let op = RenameOperation::new(old.clone(), taken);
        assert_eq!(
            op.validate(),
            Err(ValidationError::NameTaken("b.txt".into()))
        );

        let op = RenameOperation::new(dir.path().join("missing"), dir.path().join("c"));
        assert!(matches!(op.validate(), Err(ValidationError::SourceMissing(_))));

        let op = RenameOperation::new(old, dir.path().join("bad."));
        assert!(matches!(op.validate(), Err(ValidationError::InvalidName(_))));
    }

    #[test]
    fn test_rename_to_different_case() {
        let dir = TempDir::new().unwrap();
        let old = dir.path().join("readme.md");
        let new = dir.path().join("README.md");
        fs::write(&old, b"r").unwrap();
        let ctx = OperationContext::detached(EngineConfig::default());

        let mut op = RenameOperation::new(old, new.clone());
        op.validate().unwrap();
        op.perform(&ctx).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("README.md")]);
    }

    #[test]
    fn test_undo_fails_when_renamed_item_gone() {
        let dir = TempDir::new().unwrap();
        let old = dir.path().join("x");
        let new = dir.path().join("y");
        fs::write(&old, b"x").unwrap();
        let ctx = OperationContext::detached(EngineConfig::default());

        let mut op = RenameOperation::new(old, new.clone());
        op.perform(&ctx).unwrap();
        fs::remove_file(&new).unwrap();

        assert!(matches!(op.undo(&ctx), Err(OpError::NotFound { .. })));
    }
}
