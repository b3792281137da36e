//! File-operation engine for duopane.
//!
//! Copy, move, delete, create-folder and rename are modelled as
//! [`Operation`] values that run through one fixed lifecycle
//! ([`execute`]): validate, prepare, perform, finish and audit. Each
//! operation keeps what it needs to reverse itself, so the most recent one
//! can be undone. [`OperationService`] runs operations on a worker pool,
//! owns the undo history and routes progress and results back to the
//! presentation thread through a [`Dispatcher`].

mod audit;
mod backup;
mod context;
mod copy;
mod create;
mod delete;
mod dispatch;
mod factory;
mod force_delete;
mod fs_util;
mod history;
mod lifecycle;
mod move_op;
mod naming;
mod operation;
mod progress;
mod rename;
mod result;
mod service;

pub use audit::{AuditRecord, AuditSink, AuditStatus, JsonlAuditLog, NullAuditLog};
pub use backup::{Backup, BackupStore, Skipped};
pub use context::OperationContext;
pub use copy::CopyOperation;
pub use create::CreateFolderOperation;
pub use delete::DeleteOperation;
pub use dispatch::{ChannelDispatcher, DispatchQueue, Dispatcher, InlineDispatcher, Job};
pub use factory::{OperationFactory, OperationRequest};
pub use force_delete::{DELETE_LADDER, DeleteStrategy, force_remove, force_remove_tree};
pub use history::UndoHistory;
pub use lifecycle::execute;
pub use move_op::MoveOperation;
pub use naming::{copy_target_path, split_extension};
pub use operation::{Operation, OperationVariant, UndoOutcome};
pub use progress::{
    CancelFlag, OperationType, ProgressCallback, ProgressReporter, ProgressSlot, status,
};
pub use rename::{RenameOperation, validate_filename};
pub use result::{OperationResult, SUCCESS_MESSAGE};
pub use service::OperationService;
