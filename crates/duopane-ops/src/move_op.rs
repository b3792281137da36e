//! Move files and folders into another folder.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, warn};

use duopane_core::{OpError, ValidationError};

use crate::context::OperationContext;
use crate::fs_util::{
    display_name, is_real_dir, is_within, is_writable, move_item, path_exists, resolved,
};
use crate::operation::{Lifecycle, UndoOutcome};
use crate::progress::{OperationType, status};

/// Moves each source to `destination/<name>`.
#[derive(Debug, Clone)]
pub struct MoveOperation {
    sources: Vec<PathBuf>,
    destination: PathBuf,
    /// New path to original path, in move order.
    moved: IndexMap<PathBuf, PathBuf>,
}

impl MoveOperation {
    /// Create a move of `sources` into `destination`.
    pub fn new(sources: Vec<PathBuf>, destination: PathBuf) -> Self {
        Self {
            sources,
            destination,
            moved: IndexMap::new(),
        }
    }

    /// Moves performed so far, as (new path, original path) in move order.
    pub fn moved(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.moved.iter().map(|(to, from)| (to.as_path(), from.as_path()))
    }
}

impl Lifecycle for MoveOperation {
    fn operation_type(&self) -> OperationType {
        OperationType::Move
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

            let Some(name) = source.file_name() else {
                return Err(ValidationError::InvalidName(source.display().to_string()));
            };

            if source
                .parent()
                .is_some_and(|parent| resolved(parent) == resolved(&self.destination))
            {
                return Err(ValidationError::SameFolder);
            }

            if is_real_dir(source) && is_within(&self.destination, source) {
                return Err(ValidationError::IntoItself(source.clone()));
            }

            if path_exists(&self.destination.join(name)) {
                return Err(ValidationError::NameTaken(name.to_string_lossy().into_owned()));
            }
        }

        if !path_exists(&self.destination) {
            return Err(ValidationError::DestinationMissing(self.destination.clone()));
        }
        if !self.destination.is_dir() {
            return Err(ValidationError::DestinationNotFolder(self.destination.clone()));
        }
        if !is_writable(&self.destination) {
            return Err(ValidationError::DestinationReadOnly(self.destination.clone()));
        }

        Ok(())
    }

    fn perform(&mut self, ctx: &OperationContext) -> Result<(), OpError> {
        let reporter = ctx.reporter();
        reporter.status(status::MOVING);

        let total = self.sources.len();
        let mut current = 0;

        for source in &self.sources {
            ctx.check_cancelled()?;

            let Some(name) = source.file_name() else {
                continue;
            };
            let target = self.destination.join(name);
            if *source == target {
                continue;
            }

            move_item(source, &target).map_err(|e| OpError::io(source, e))?;
            self.moved.insert(target, source.clone());

            current += 1;
            reporter.progress(current, total, &display_name(source));
        }

        Ok(())
    }

    fn undo(&mut self, _ctx: &OperationContext) -> Result<UndoOutcome, OpError> {
        let mut restored = 0;
        let mut first_error = None;

        for (target, original) in self.moved.iter().rev() {
            if !path_exists(target) {
                debug!("Skipping {}, no longer at its new location", target.display());
                continue;
            }
            match move_item(target, original) {
                Ok(()) => restored += 1,
                Err(e) => {
                    warn!("Could not move {} back: {e}", target.display());
                    first_error.get_or_insert_with(|| OpError::io(target, e));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(UndoOutcome::complete(restored)),
        }
    }

    fn description(&self) -> String {
        format!(
            "Move {} items to {}",
            self.sources.len(),
            self.destination.display()
        )
    }
}
