//! The service that runs operations off the presentation thread.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, error, info, warn};

use duopane_core::{EngineConfig, OpError};

use crate::audit::AuditSink;
use crate::context::OperationContext;
use crate::dispatch::Dispatcher;
use crate::factory::{OperationFactory, OperationRequest};
use crate::history::UndoHistory;
use crate::lifecycle::execute;
use crate::progress::{CancelFlag, ProgressCallback, ProgressReporter, ProgressSlot};
use crate::result::OperationResult;

/// Executes operations on a bounded worker pool and keeps the undo history.
///
/// Every submission ends in exactly one call of its completion callback,
/// delivered through the dispatcher. Successful operations are pushed onto
/// the history before that callback runs.
///
/// There is one cancellation flag for the whole service. It is lowered when
/// a copy, move or delete is submitted and raised by
/// [`OperationService::cancel_current`], which stops every running
/// operation that polls it.
pub struct OperationService {
    pool: ThreadPool,
    history: Arc<Mutex<UndoHistory>>,
    progress: ProgressSlot,
    cancel: CancelFlag,
    dispatcher: Arc<dyn Dispatcher>,
    audit: Arc<dyn AuditSink>,
    config: Arc<EngineConfig>,
}

impl OperationService {
    /// Create a service with `config.workers` worker threads.
    pub fn new(
        config: EngineConfig,
        dispatcher: Arc<dyn Dispatcher>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, OpError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("duopane-worker-{i}"))
            .build()
            .map_err(|e| OpError::internal(format!("Failed to start worker pool: {e}")))?;

        debug!("Operation service started with {} workers", config.workers);

        Ok(Self {
            pool,
            history: Arc::new(Mutex::new(UndoHistory::new(config.history_depth))),
            progress: ProgressSlot::default(),
            cancel: CancelFlag::new(),
            dispatcher,
            audit,
            config: Arc::new(config),
        })
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Copy `sources` into `destination`.
    pub fn execute_copy<F>(
        &self,
        sources: Vec<PathBuf>,
        destination: PathBuf,
        add_copy_suffix: bool,
        on_complete: F,
    ) where
        F: FnOnce(OperationResult) + Send + 'static,
    {
        self.execute(
            OperationRequest::copy(sources, destination, add_copy_suffix),
            on_complete,
        );
    }

    /// Move `sources` into `destination`.
    pub fn execute_move<F>(&self, sources: Vec<PathBuf>, destination: PathBuf, on_complete: F)
    where
        F: FnOnce(OperationResult) + Send + 'static,
    {
        self.execute(OperationRequest::move_to(sources, destination), on_complete);
    }

    /// Delete `targets`.
    pub fn execute_delete<F>(&self, targets: Vec<PathBuf>, on_complete: F)
    where
        F: FnOnce(OperationResult) + Send + 'static,
    {
        self.execute(OperationRequest::delete(targets), on_complete);
    }

    /// Create the folder `path`.
    pub fn execute_create_folder<F>(&self, path: PathBuf, on_complete: F)
    where
        F: FnOnce(OperationResult) + Send + 'static,
    {
        self.execute(OperationRequest::create_folder(path), on_complete);
    }

    /// Rename `old_path` to `new_path`.
    pub fn execute_rename<F>(&self, old_path: PathBuf, new_path: PathBuf, on_complete: F)
    where
        F: FnOnce(OperationResult) + Send + 'static,
    {
        self.execute(OperationRequest::rename(old_path, new_path), on_complete);
    }

    /// Build the operation for `request` and run it on a worker.
    pub fn execute<F>(&self, request: OperationRequest, on_complete: F)
    where
        F: FnOnce(OperationResult) + Send + 'static,
    {
        let mut operation = OperationFactory::create(request);
        if operation.operation_type().is_interactive() {
            self.cancel.reset();
        }

        let ctx = self.context();
        let history = Arc::clone(&self.history);
        let dispatcher = Arc::clone(&self.dispatcher);

        self.pool.spawn(move || {
            let result = match panic::catch_unwind(AssertUnwindSafe(|| {
                execute(&mut operation, &ctx)
            })) {
                Ok(result) => result,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!("{} panicked: {message}", operation.operation_type());
                    OperationResult::failure(OpError::internal(message), None)
                }
            };

            if result.is_success() {
                lock(&history).push(operation);
            }

            dispatcher.dispatch(Box::new(move || on_complete(result)));
        });
    }

    /// Undo the most recent successful operation.
    ///
    /// The operation leaves the history whether or not its undo succeeds.
    pub fn undo_last<F>(&self, on_complete: F)
    where
        F: FnOnce(OperationResult) + Send + 'static,
    {
        let Some(mut operation) = lock(&self.history).pop() else {
            let result = OperationResult::failure(OpError::NothingToUndo, None);
            self.dispatcher.dispatch(Box::new(move || on_complete(result)));
            return;
        };

        let ctx = self.context();
        let dispatcher = Arc::clone(&self.dispatcher);

        self.pool.spawn(move || {
            let description = operation.description();
            let result = match panic::catch_unwind(AssertUnwindSafe(|| operation.undo(&ctx))) {
                Ok(Ok(outcome)) => {
                    info!("Undone: {description}");
                    OperationResult::success_with_message(
                        outcome.summary(),
                        operation.affected_paths(),
                    )
                }
                Ok(Err(e)) => {
                    warn!("Undo of '{description}' failed: {e}");
                    OperationResult::failure(e, operation.context_path())
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!("Undo of '{description}' panicked: {message}");
                    OperationResult::failure(OpError::internal(message), None)
                }
            };

            dispatcher.dispatch(Box::new(move || on_complete(result)));
        });
    }

    /// Raise the shared cancellation flag.
    pub fn cancel_current(&self) {
        info!("Cancellation requested");
        self.cancel.cancel();
    }

    /// Install or clear the progress callback.
    pub fn set_progress_callback(&self, callback: Option<Arc<dyn ProgressCallback>>) {
        self.progress.set(callback);
    }

    /// Re-point the create-folder operation on top of the history after the
    /// folder was renamed from `old_path` to `new_path`.
    pub fn update_last_created_folder(&self, old_path: &Path, new_path: PathBuf) -> bool {
        lock(&self.history).update_last_created_folder(old_path, new_path)
    }

    /// Whether there is anything to undo.
    pub fn can_undo(&self) -> bool {
        !lock(&self.history).is_empty()
    }

    /// Number of operations in the undo history.
    pub fn history_len(&self) -> usize {
        lock(&self.history).len()
    }

    /// Description of the operation [`OperationService::undo_last`] would
    /// reverse.
    pub fn last_description(&self) -> Option<String> {
        lock(&self.history).peek().map(|op| op.description())
    }

    fn context(&self) -> OperationContext {
        let reporter = ProgressReporter::new(
            self.progress.clone(),
            Arc::clone(&self.dispatcher),
            self.cancel.clone(),
        );
        OperationContext::new(
            Arc::clone(&self.config),
            self.cancel.clone(),
            reporter,
            Arc::clone(&self.audit),
        )
    }
}

impl std::fmt::Debug for OperationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationService")
            .field("workers", &self.pool.current_num_threads())
            .field("history_len", &self.history_len())
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

fn lock(history: &Mutex<UndoHistory>) -> MutexGuard<'_, UndoHistory> {
    history.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}
