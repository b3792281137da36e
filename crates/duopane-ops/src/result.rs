//! The outcome reported for every execute and undo.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use duopane_core::OpError;

/// Message carried by successful results.
pub const SUCCESS_MESSAGE: &str = "Operation completed successfully";

/// The outcome of an operation.
///
/// Immutable once built; it is the only channel through which the engine
/// reports what happened.
#[derive(Debug, Clone)]
pub struct OperationResult {
    success: bool,
    message: String,
    affected_paths: Vec<PathBuf>,
    error: Option<Arc<OpError>>,
}

impl OperationResult {
    /// A successful result touching `affected_paths`.
    pub fn success(affected_paths: Vec<PathBuf>) -> Self {
        Self::success_with_message(SUCCESS_MESSAGE, affected_paths)
    }

    /// A successful result with a custom message.
    pub fn success_with_message(message: impl Into<String>, affected_paths: Vec<PathBuf>) -> Self {
        Self {
            success: true,
            message: message.into(),
            affected_paths,
            error: None,
        }
    }

    /// A failed result. `context` selects the permission message wording.
    pub fn failure(error: OpError, context: Option<&Path>) -> Self {
        Self {
            success: false,
            message: error.user_message(context),
            affected_paths: Vec::new(),
            error: Some(Arc::new(error)),
        }
    }

    /// Check if the operation succeeded.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// The user-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Paths the operation touched.
    pub fn affected_paths(&self) -> &[PathBuf] {
        &self.affected_paths
    }

    /// The underlying error, for failed results.
    pub fn error(&self) -> Option<&OpError> {
        self.error.as_deref()
    }

    /// Whether the failure came from the cancellation flag.
    pub fn is_cancelled(&self) -> bool {
        self.error().is_some_and(OpError::is_cancelled)
    }
}
