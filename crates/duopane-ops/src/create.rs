//! Folder creation.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use duopane_core::{OpError, ValidationError};

use crate::context::OperationContext;
use crate::fs_util::{display_name, is_real_dir, is_writable, path_exists};
use crate::operation::{Lifecycle, UndoOutcome};
use crate::progress::OperationType;
use crate::rename::validate_filename;

/// Creates one directory.
#[derive(Debug, Clone)]
pub struct CreateFolderOperation {
    path: PathBuf,
}

impl CreateFolderOperation {
    /// Create the operation for `path`.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// The folder this operation creates.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Point the operation at a new path after the folder was renamed in place.
    pub fn set_path(&mut self, path: PathBuf) {
        self.path = path;
    }
}

impl Lifecycle for CreateFolderOperation {
    fn operation_type(&self) -> OperationType {
        OperationType::CreateFolder
    }

    fn sources(&self) -> &[PathBuf] {
        std::slice::from_ref(&self.path)
    }

    fn destination(&self) -> Option<&Path> {
        None
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = self.path.file_name() {
            validate_filename(&name.to_string_lossy()).map_err(ValidationError::InvalidName)?;
        }

        if path_exists(&self.path) {
            return Err(ValidationError::FolderExists(self.path.clone()));
        }

        let parent = self.path.parent().ok_or(ValidationError::ParentMissing)?;
        if !parent.is_dir() {
            return Err(ValidationError::ParentMissing);
        }
        if !is_writable(parent) {
            return Err(ValidationError::ParentReadOnly);
        }

        Ok(())
    }

    fn perform(&mut self, _ctx: &OperationContext) -> Result<(), OpError> {
        fs::create_dir(&self.path).map_err(|e| OpError::io(&self.path, e))
    }

    fn undo(&mut self, _ctx: &OperationContext) -> Result<UndoOutcome, OpError> {
        if !is_real_dir(&self.path) {
            debug!("Folder {} already gone", self.path.display());
            return Ok(UndoOutcome::default());
        }

        let mut entries = fs::read_dir(&self.path).map_err(|e| OpError::io(&self.path, e))?;
        if entries.next().is_some() {
            return Err(OpError::DirectoryNotEmpty {
                path: self.path.clone(),
            });
        }

        fs::remove_dir(&self.path).map_err(|e| OpError::io(&self.path, e))?;
        Ok(UndoOutcome::complete(1))
    }

    fn description(&self) -> String {
        format!("Create folder: {}", display_name(&self.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duopane_core::EngineConfig;
    use tempfile::TempDir;

    fn ctx() -> OperationContext {
        OperationContext::detached(EngineConfig::default())
    }

    #[test]
    fn test_create_and_undo() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("new folder");

        let mut op = CreateFolderOperation::new(target.clone());
        op.validate().unwrap();
        op.perform(&ctx()).unwrap();
        assert!(target.is_dir());

        assert_eq!(op.undo(&ctx()).unwrap(), UndoOutcome::complete(1));
        assert!(!target.exists());

        // Already gone: nothing to do.
        assert_eq!(op.undo(&ctx()).unwrap(), UndoOutcome::default());
    }

    #[test]
    fn test_undo_refuses_non_empty_folder() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("filled");

        let mut op = CreateFolderOperation::new(target.clone());
        op.perform(&ctx()).unwrap();
        fs::write(target.join("inside.txt"), b"i").unwrap();

        assert!(matches!(
            op.undo(&ctx()),
            Err(OpError::DirectoryNotEmpty { .. })
        ));
        assert!(target.join("inside.txt").exists());
    }

    #[test]
    fn test_validation() {
        let dir = TempDir::new().unwrap();

        let op = CreateFolderOperation::new(dir.path().join("missing/child"));
        assert_eq!(op.validate(), Err(ValidationError::ParentMissing));

        fs::create_dir(dir.path().join("exists")).unwrap();
        let op = CreateFolderOperation::new(dir.path().join("exists"));
        assert!(matches!(op.validate(), Err(ValidationError::FolderExists(_))));

        let op = CreateFolderOperation::new(dir.path().join("trailing."));
        assert!(matches!(op.validate(), Err(ValidationError::InvalidName(_))));
    }

    #[test]
    fn test_set_path_redirects_undo() {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("New Folder");
        let renamed = dir.path().join("Projects");

        let mut op = CreateFolderOperation::new(original.clone());
        op.perform(&ctx()).unwrap();
        fs::rename(&original, &renamed).unwrap();
        op.set_path(renamed.clone());

        op.undo(&ctx()).unwrap();
        assert!(!renamed.exists());
    }
}
