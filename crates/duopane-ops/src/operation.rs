//! The operation variants and the hooks the lifecycle drives.

use std::path::{Path, PathBuf};

use duopane_core::{OpError, ValidationError};

use crate::context::OperationContext;
use crate::copy::CopyOperation;
use crate::create::CreateFolderOperation;
use crate::delete::DeleteOperation;
use crate::move_op::MoveOperation;
use crate::progress::OperationType;
use crate::rename::RenameOperation;
use crate::result::OperationResult;

/// Hooks called by [`crate::execute`], in order: validate, prepare, perform,
/// finish, then cleanup on every exit path.
pub(crate) trait Lifecycle {
    fn operation_type(&self) -> OperationType;

    fn sources(&self) -> &[PathBuf];

    fn destination(&self) -> Option<&Path>;

    /// Read-only pre-flight checks.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Cheap setup such as counting files for progress totals.
    fn prepare(&mut self, _ctx: &OperationContext) {}

    /// The mutation itself.
    fn perform(&mut self, ctx: &OperationContext) -> Result<(), OpError>;

    fn finish(&mut self, _ctx: &OperationContext) {}

    fn cleanup(&mut self) {}

    /// Reverse a completed perform, best effort.
    fn undo(&mut self, ctx: &OperationContext) -> Result<UndoOutcome, OpError>;

    fn description(&self) -> String;

    fn affected_paths(&self) -> Vec<PathBuf> {
        let mut paths = self.sources().to_vec();
        if let Some(destination) = self.destination() {
            paths.push(destination.to_path_buf());
        }
        paths
    }
}

/// What an undo managed to put back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndoOutcome {
    /// Items restored or removed.
    pub restored: usize,
    /// Files that were deleted without a backup and stay deleted.
    pub unrecoverable: Vec<PathBuf>,
}

impl UndoOutcome {
    /// An outcome that reversed `restored` items completely.
    pub fn complete(restored: usize) -> Self {
        Self {
            restored,
            unrecoverable: Vec::new(),
        }
    }

    /// Check whether everything was reversed.
    pub fn is_complete(&self) -> bool {
        self.unrecoverable.is_empty()
    }

    /// Message shown after the undo.
    pub fn summary(&self) -> String {
        if self.is_complete() {
            "Operation undone successfully".to_string()
        } else {
            format!(
                "Operation undone; {} file(s) were too large to back up and could not be restored",
                self.unrecoverable.len()
            )
        }
    }
}

/// The concrete operation carried by an [`Operation`].
#[derive(Debug)]
pub enum OperationVariant {
    Copy(CopyOperation),
    Move(MoveOperation),
    Delete(DeleteOperation),
    CreateFolder(CreateFolderOperation),
    Rename(RenameOperation),
}

impl OperationVariant {
    pub(crate) fn hooks(&self) -> &dyn Lifecycle {
        match self {
            Self::Copy(op) => op,
            Self::Move(op) => op,
            Self::Delete(op) => op,
            Self::CreateFolder(op) => op,
            Self::Rename(op) => op,
        }
    }

    pub(crate) fn hooks_mut(&mut self) -> &mut dyn Lifecycle {
        match self {
            Self::Copy(op) => op,
            Self::Move(op) => op,
            Self::Delete(op) => op,
            Self::CreateFolder(op) => op,
            Self::Rename(op) => op,
        }
    }
}

/// One filesystem mutation with its validation state, result and undo data.
///
/// Run it with [`crate::execute`]; reverse it with [`Operation::undo`].
#[derive(Debug)]
pub struct Operation {
    pub(crate) variant: OperationVariant,
    pub(crate) validation_error: Option<ValidationError>,
    pub(crate) result: Option<OperationResult>,
}

impl Operation {
    /// Wrap a variant in a fresh, unexecuted operation.
    pub fn new(variant: OperationVariant) -> Self {
        Self {
            variant,
            validation_error: None,
            result: None,
        }
    }

    /// The concrete operation.
    pub fn variant(&self) -> &OperationVariant {
        &self.variant
    }

    /// Mutable access to the concrete operation.
    pub fn variant_mut(&mut self) -> &mut OperationVariant {
        &mut self.variant
    }

    /// The operation kind.
    pub fn operation_type(&self) -> OperationType {
        self.variant.hooks().operation_type()
    }

    /// Human-readable description.
    pub fn description(&self) -> String {
        self.variant.hooks().description()
    }

    /// Source paths, in request order.
    pub fn sources(&self) -> &[PathBuf] {
        self.variant.hooks().sources()
    }

    /// Destination path, if the kind has one.
    pub fn destination(&self) -> Option<&Path> {
        self.variant.hooks().destination()
    }

    /// Sources plus destination.
    pub fn affected_paths(&self) -> Vec<PathBuf> {
        self.variant.hooks().affected_paths()
    }

    /// Run the pre-flight checks without executing. Never touches the disk.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.variant.hooks().validate()
    }

    /// The validation failure from the last execute, if any.
    pub fn validation_error(&self) -> Option<&ValidationError> {
        self.validation_error.as_ref()
    }

    /// The result, once executed.
    pub fn result(&self) -> Option<&OperationResult> {
        self.result.as_ref()
    }

    /// Check whether execute has run.
    pub fn is_executed(&self) -> bool {
        self.result.is_some()
    }

    /// Reverse the operation, best effort.
    pub fn undo(&mut self, ctx: &OperationContext) -> Result<UndoOutcome, OpError> {
        self.variant.hooks_mut().undo(ctx)
    }

    /// The path named in permission messages: destination, else first source.
    pub fn context_path(&self) -> Option<&Path> {
        self.destination()
            .or_else(|| self.sources().first().map(PathBuf::as_path))
    }
}

macro_rules! impl_from_variant {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Operation {
                fn from(op: $ty) -> Self {
                    Self::new(OperationVariant::$variant(op))
                }
            }
        )*
    };
}

impl_from_variant! {
    CopyOperation => Copy,
    MoveOperation => Move,
    DeleteOperation => Delete,
    CreateFolderOperation => CreateFolder,
    RenameOperation => Rename,
}
