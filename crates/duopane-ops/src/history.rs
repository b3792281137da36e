//! Undo history of completed operations.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::operation::{Operation, OperationVariant};

/// LIFO stack of completed operations with a maximum depth.
///
/// Pushing onto a full history evicts the oldest entry.
#[derive(Debug)]
pub struct UndoHistory {
    entries: VecDeque<Operation>,
    max_entries: usize,
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new(100)
    }
}

impl UndoHistory {
    /// Create a history holding at most `max_entries` operations.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries.min(1000)),
            max_entries: max_entries.max(1),
        }
    }

    /// Push a completed operation.
    pub fn push(&mut self, operation: Operation) {
        if self.entries.len() >= self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(operation);
    }

    /// Pop the most recent operation.
    pub fn pop(&mut self) -> Option<Operation> {
        self.entries.pop_back()
    }

    /// Peek at the most recent operation without removing it.
    pub fn peek(&self) -> Option<&Operation> {
        self.entries.back()
    }

    /// Re-point a create-folder operation at the top of the history.
    ///
    /// Used after a freshly created folder is renamed in place, so undo
    /// removes it under its new name. Returns whether an entry was updated.
    pub fn update_last_created_folder(&mut self, old_path: &Path, new_path: PathBuf) -> bool {
        let Some(top) = self.entries.back_mut() else {
            return false;
        };
        match top.variant_mut() {
            OperationVariant::CreateFolder(create) if create.path() == old_path => {
                create.set_path(new_path);
                true
            }
            _ => false,
        }
    }

    /// Get the number of operations in the history.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the history is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all operations.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate over operations (oldest first).
    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.entries.iter()
    }
}
