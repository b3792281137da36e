//! Everything an operation needs from its environment while it runs.

use std::sync::Arc;

use duopane_core::{EngineConfig, OpError};

use crate::audit::{AuditSink, NullAuditLog};
use crate::progress::{CancelFlag, ProgressReporter};

/// Shared state handed to an operation for one execute or undo.
///
/// Operations only read the cancellation flag and call the reporter; they
/// never mutate service state.
#[derive(Clone)]
pub struct OperationContext {
    config: Arc<EngineConfig>,
    cancel: CancelFlag,
    reporter: ProgressReporter,
    audit: Arc<dyn AuditSink>,
}

impl OperationContext {
    /// Create a context from its parts.
    pub fn new(
        config: Arc<EngineConfig>,
        cancel: CancelFlag,
        reporter: ProgressReporter,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            config,
            cancel,
            reporter,
            audit,
        }
    }

    /// A context with no progress callback, no audit log and its own flag.
    pub fn detached(config: EngineConfig) -> Self {
        Self::new(
            Arc::new(config),
            CancelFlag::new(),
            ProgressReporter::silent(),
            Arc::new(NullAuditLog),
        )
    }

    /// Replace the progress reporter.
    pub fn with_reporter(mut self, reporter: ProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Replace the audit sink.
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The cancellation flag.
    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Check whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail with [`OpError::Cancelled`] if cancellation was requested.
    pub fn check_cancelled(&self) -> Result<(), OpError> {
        if self.is_cancelled() {
            Err(OpError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// The progress reporter.
    pub fn reporter(&self) -> &ProgressReporter {
        &self.reporter
    }

    /// The audit sink.
    pub fn audit(&self) -> &dyn AuditSink {
        self.audit.as_ref()
    }
}

impl std::fmt::Debug for OperationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationContext")
            .field("config", &self.config)
            .field("cancel", &self.cancel)
            .field("reporter", &self.reporter)
            .finish_non_exhaustive()
    }
}
