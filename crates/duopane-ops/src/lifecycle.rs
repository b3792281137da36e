//! The fixed execute sequence shared by every operation.

use tracing::{debug, info, warn};

use duopane_core::{OpError, ValidationError};

use crate::audit::AuditRecord;
use crate::context::OperationContext;
use crate::operation::{Lifecycle, Operation};
use crate::result::OperationResult;

/// Runs `cleanup` when dropped, including while unwinding.
struct CleanupGuard<'a>(&'a mut dyn Lifecycle);

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        self.0.cleanup();
    }
}

/// Execute an operation: validate, prepare, perform, finish, then audit.
///
/// The returned result is also stored on the operation. Errors raised while
/// performing are turned into a failed result; they never propagate. A second
/// call returns a failure without touching the filesystem.
pub fn execute(op: &mut Operation, ctx: &OperationContext) -> OperationResult {
    if op.result.is_some() {
        return OperationResult::failure(OpError::AlreadyExecuted, None);
    }

    let context = op.context_path().map(|p| p.to_path_buf());
    let operation_type = op.operation_type();
    let description = op.description();

    let outcome = match run_hooks(op.variant.hooks_mut(), ctx) {
        Ok(outcome) => outcome,
        Err(e) => {
            debug!("Validation failed for {operation_type}: {e}");
            op.validation_error = Some(e.clone());
            let result = OperationResult::failure(e.into(), None);
            op.result = Some(result.clone());
            return result;
        }
    };

    let result = match outcome {
        Ok(()) => {
            info!("{description}");
            ctx.audit()
                .record(&AuditRecord::success(operation_type, &description));
            OperationResult::success(op.affected_paths())
        }
        Err(e) => {
            if e.is_cancelled() {
                info!("{operation_type} cancelled");
            } else {
                warn!("{operation_type} failed: {e}");
            }
            let result = OperationResult::failure(e, context.as_deref());
            ctx.audit().record(&AuditRecord::failure(
                operation_type,
                &description,
                result.message(),
            ));
            result
        }
    };

    op.result = Some(result.clone());
    result
}

/// Drive the hooks in order under a cleanup guard.
///
/// The outer error is a validation failure, the inner one comes from perform.
fn run_hooks(
    hooks: &mut dyn Lifecycle,
    ctx: &OperationContext,
) -> Result<Result<(), OpError>, ValidationError> {
    let mut guard = CleanupGuard(hooks);
    let operation_type = guard.0.operation_type();

    guard.0.validate()?;

    debug!("Preparing {operation_type}");
    guard.0.prepare(ctx);
    debug!("Performing {operation_type}");
    let outcome = guard.0.perform(ctx);
    if outcome.is_ok() {
        guard.0.finish(ctx);
    }
    Ok(outcome)
}
