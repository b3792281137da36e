//! Progress reporting and cancellation for running operations.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::dispatch::{Dispatcher, InlineDispatcher};

/// The type of operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    Copy,
    Move,
    Delete,
    CreateFolder,
    Rename,
}

impl OperationType {
    /// Label used in the audit log.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Copy => "Copy",
            Self::Move => "Move",
            Self::Delete => "Delete",
            Self::CreateFolder => "Create Folder",
            Self::Rename => "Rename",
        }
    }

    /// Whether a new submission of this type resets the cancellation flag.
    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Copy | Self::Move | Self::Delete)
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Receives progress for the operation currently shown to the user.
///
/// Both methods run on the presentation thread.
pub trait ProgressCallback: Send + Sync {
    /// `current` of `total` items are done; `current_item` was the last one.
    fn on_progress(&self, current: usize, total: usize, current_item: &str);

    /// The operation entered a new phase.
    fn on_status_change(&self, status: &str);
}

/// Status labels reported through [`ProgressCallback::on_status_change`].
pub mod status {
    pub const COUNTING: &str = "Counting files...";
    pub const COPYING: &str = "Copying Files";
    pub const MOVING: &str = "Moving Files";
    pub const DELETING: &str = "Deleting files...";
    pub const RESTORING: &str = "Preparing to restore files...";
}

/// Shared cancellation flag polled by long-running operations.
///
/// One flag serves every operation submitted to a service; raising it stops
/// all of them.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create a lowered flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Lower the flag.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    /// Check whether the flag is raised.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The single progress-callback slot owned by a service.
#[derive(Clone, Default)]
pub struct ProgressSlot(Arc<RwLock<Option<Arc<dyn ProgressCallback>>>>);

impl ProgressSlot {
    /// Replace the callback (None clears it).
    pub fn set(&self, callback: Option<Arc<dyn ProgressCallback>>) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = callback;
    }

    /// The callback currently installed.
    pub fn get(&self) -> Option<Arc<dyn ProgressCallback>> {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl fmt::Debug for ProgressSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressSlot")
            .field("installed", &self.get().is_some())
            .finish()
    }
}

/// Forwards progress from a worker to the slot's callback on the
/// presentation thread.
#[derive(Clone)]
pub struct ProgressReporter {
    slot: ProgressSlot,
    dispatcher: Arc<dyn Dispatcher>,
    cancel: CancelFlag,
}

impl ProgressReporter {
    /// Create a reporter bound to a slot, a dispatcher and the cancel flag.
    pub fn new(slot: ProgressSlot, dispatcher: Arc<dyn Dispatcher>, cancel: CancelFlag) -> Self {
        Self {
            slot,
            dispatcher,
            cancel,
        }
    }

    /// A reporter with an empty slot.
    pub fn silent() -> Self {
        Self::new(
            ProgressSlot::default(),
            Arc::new(InlineDispatcher),
            CancelFlag::new(),
        )
    }

    /// Report item progress. Dropped once cancellation is requested.
    pub fn progress(&self, current: usize, total: usize, current_item: &str) {
        if self.cancel.is_cancelled() {
            return;
        }
        if let Some(callback) = self.slot.get() {
            let item = current_item.to_string();
            self.dispatcher.dispatch(Box::new(move || {
                callback.on_progress(current, total, &item);
            }));
        }
    }

    /// Report a phase change.
    pub fn status(&self, status: &str) {
        if let Some(callback) = self.slot.get() {
            let status = status.to_string();
            self.dispatcher.dispatch(Box::new(move || {
                callback.on_status_change(&status);
            }));
        }
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("slot", &self.slot)
            .field("cancel", &self.cancel)
            .finish()
    }
}
