//! Error types for file operations.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// A pre-flight check that failed. Raised before anything touches the disk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("File does not exist: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Cannot copy folder into itself: {}", .0.display())]
    IntoItself(PathBuf),

    #[error("Destination folder does not exist: {}", .0.display())]
    DestinationMissing(PathBuf),

    #[error("Destination path is not a folder: {}", .0.display())]
    DestinationNotFolder(PathBuf),

    #[error("No write permission to destination folder: {}", .0.display())]
    DestinationReadOnly(PathBuf),

    #[error("Cannot move files to the same folder")]
    SameFolder,

    #[error("File or folder named '{0}' already exists in destination")]
    NameTaken(String),

    #[error("Folder already exists: {}", .0.display())]
    FolderExists(PathBuf),

    #[error("Parent folder does not exist")]
    ParentMissing,

    #[error("No write permission to parent folder")]
    ParentReadOnly,

    #[error("No write permission: {}", .0.display())]
    NoWriteAccess(PathBuf),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Nothing to operate on")]
    NoSources,
}

/// Errors that can occur while executing or undoing an operation.
#[derive(Debug, Error)]
pub enum OpError {
    /// A pre-flight check failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Permission denied for a path.
    #[error("Permission denied: {}", .path.display())]
    PermissionDenied { path: PathBuf },

    /// Path not found (it vanished mid-operation).
    #[error("File not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// A directory that had to be removed still has contents.
    #[error("Cannot delete non-empty folder: {}", .path.display())]
    DirectoryNotEmpty { path: PathBuf },

    /// Every forced-delete strategy failed.
    #[error("Cannot delete locked file: {}", .path.display())]
    Locked {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic I/O error.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The shared cancellation flag was raised.
    #[error("Operation cancelled by user")]
    Cancelled,

    /// Undo requested with an empty history.
    #[error("Nothing to undo")]
    NothingToUndo,

    /// `execute` called on an operation that already has a result.
    #[error("Operation has already been executed")]
    AlreadyExecuted,

    /// A worker panicked or a bug surfaced.
    #[error("Unknown error during operation: {message}")]
    Internal { message: String },
}

impl OpError {
    /// Create an I/O error with path context, classified by kind.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::DirectoryNotEmpty => Self::DirectoryNotEmpty { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error came from the cancellation flag.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether this error is a permission problem.
    pub fn is_permission(&self) -> bool {
        match self {
            Self::PermissionDenied { .. } => true,
            Self::Locked { source, .. } => {
                source.kind() == std::io::ErrorKind::PermissionDenied
            }
            _ => false,
        }
    }

    /// Render the message shown to the user.
    ///
    /// `context` is the path the operation was aimed at (its destination, or
    /// its first source). Permission failures mention it and say whether it is
    /// a protected system location.
    pub fn user_message(&self, context: Option<&Path>) -> String {
        if !self.is_permission() {
            return self.to_string();
        }

        match context {
            Some(path) if is_system_location(path) => format!(
                "Access error: Cannot write to system folder {}. Choose another folder or run as administrator.",
                path.display()
            ),
            Some(path) => format!(
                "Access error: Cannot write to folder {}. Choose another folder or check permissions.",
                path.display()
            ),
            None => "Access denied. Check file or folder permissions.".to_string(),
        }
    }
}

#[cfg(unix)]
const SYSTEM_ROOTS: &[&str] = &[
    "/bin", "/boot", "/dev", "/etc", "/lib", "/lib64", "/proc", "/sbin", "/sys", "/usr",
    "/System", "/Library",
];

/// Check whether a path sits in an operating-system owned location.
pub fn is_system_location(path: &Path) -> bool {
    #[cfg(windows)]
    {
        let text = path.to_string_lossy().to_ascii_uppercase();
        text.starts_with("C:\\") && !text.starts_with("C:\\USERS\\")
    }

    #[cfg(unix)]
    {
        SYSTEM_ROOTS.iter().any(|root| path.starts_with(root))
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = path;
        false
    }
}
