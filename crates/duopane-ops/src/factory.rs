//! Operation requests and their construction.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::copy::CopyOperation;
use crate::create::CreateFolderOperation;
use crate::delete::DeleteOperation;
use crate::move_op::MoveOperation;
use crate::operation::Operation;
use crate::progress::OperationType;
use crate::rename::RenameOperation;

/// A file operation to be built and executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationRequest {
    /// Copy files/directories into a destination.
    Copy {
        sources: Vec<PathBuf>,
        destination: PathBuf,
        #[serde(default)]
        add_copy_suffix: bool,
    },
    /// Move files/directories into a destination.
    Move {
        sources: Vec<PathBuf>,
        destination: PathBuf,
    },
    /// Permanently delete files/directories.
    Delete { targets: Vec<PathBuf> },
    /// Create a new directory.
    CreateFolder { path: PathBuf },
    /// Rename a single file or directory.
    Rename { old_path: PathBuf, new_path: PathBuf },
}

impl OperationRequest {
    /// Create a copy request.
    pub fn copy(sources: Vec<PathBuf>, destination: PathBuf, add_copy_suffix: bool) -> Self {
        Self::Copy {
            sources,
            destination,
            add_copy_suffix,
        }
    }

    /// Create a move request.
    pub fn move_to(sources: Vec<PathBuf>, destination: PathBuf) -> Self {
        Self::Move {
            sources,
            destination,
        }
    }

    /// Create a delete request.
    pub fn delete(targets: Vec<PathBuf>) -> Self {
        Self::Delete { targets }
    }

    /// Create a folder creation request.
    pub fn create_folder(path: PathBuf) -> Self {
        Self::CreateFolder { path }
    }

    /// Create a rename request.
    pub fn rename(old_path: PathBuf, new_path: PathBuf) -> Self {
        Self::Rename { old_path, new_path }
    }

    /// The kind of operation this request builds.
    pub fn operation_type(&self) -> OperationType {
        match self {
            Self::Copy { .. } => OperationType::Copy,
            Self::Move { .. } => OperationType::Move,
            Self::Delete { .. } => OperationType::Delete,
            Self::CreateFolder { .. } => OperationType::CreateFolder,
            Self::Rename { .. } => OperationType::Rename,
        }
    }
}

/// Builds operations from requests. Nothing is checked or touched here.
#[derive(Debug, Default, Clone, Copy)]
pub struct OperationFactory;

impl OperationFactory {
    /// Build the operation for `request`.
    pub fn create(request: OperationRequest) -> Operation {
        match request {
            OperationRequest::Copy {
                sources,
                destination,
                add_copy_suffix,
            } => CopyOperation::new(sources, destination, add_copy_suffix).into(),
            OperationRequest::Move {
                sources,
                destination,
            } => MoveOperation::new(sources, destination).into(),
            OperationRequest::Delete { targets } => DeleteOperation::new(targets).into(),
            OperationRequest::CreateFolder { path } => CreateFolderOperation::new(path).into(),
            OperationRequest::Rename { old_path, new_path } => {
                RenameOperation::new(old_path, new_path).into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_builds_matching_kind() {
        let requests = [
            OperationRequest::copy(vec!["/a".into()], "/b".into(), true),
            OperationRequest::move_to(vec!["/a".into()], "/b".into()),
            OperationRequest::delete(vec!["/a".into()]),
            OperationRequest::create_folder("/a/new".into()),
            OperationRequest::rename("/a/x".into(), "/a/y".into()),
        ];

        for request in requests {
            let expected = request.operation_type();
            let op = OperationFactory::create(request);
            assert_eq!(op.operation_type(), expected);
            assert!(!op.is_executed());
        }
    }

    #[test]
    fn test_request_json_shape() {
        let json = r#"{"type":"copy","sources":["/x"],"destination":"/y"}"#;
        let request: OperationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(
            request,
            OperationRequest::copy(vec!["/x".into()], "/y".into(), false)
        );

        let rename = OperationRequest::rename("/a".into(), "/b".into());
        let text = serde_json::to_string(&rename).unwrap();
        assert!(text.contains(r#""type":"rename""#));
    }
}
