//! Engine-level error taxonomy

use thiserror::Error;

use sprocket_core::TaskError;

/// Failure surfaced by the execution engine.
///
/// Lookup and validation failures are local: the engine returns them with
/// no persistence side effects. Task and unexpected failures occur after
/// the start record was written and are persisted as FAILED before being
/// surfaced: every failure is both recorded and returned, never silently
/// swallowed. No retries happen at this layer.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No handler is registered for the requested task type.
    #[error("no handler registered for task type '{task_type}'")]
    HandlerNotFound { task_type: String },

    /// The handler's `validate` rejected the context.
    #[error("task context validation failed for '{task_type}' (execution {execution_id})")]
    Validation {
        task_type: String,
        execution_id: String,
        message: String,
    },

    /// A domain failure raised by the handler's execute or hooks.
    #[error(transparent)]
    Task(#[from] TaskError),

    /// A non-domain failure (handler panic, lost dispatch) normalized by
    /// the engine.
    #[error("unexpected error executing '{task_type}' (execution {execution_id}): {details}")]
    Unexpected {
        task_type: String,
        execution_id: String,
        details: String,
    },
}

impl EngineError {
    /// Stable error code carried on persisted records and API responses.
    pub fn error_code(&self) -> &str {
        match self {
            EngineError::HandlerNotFound { .. } => "WORKFLOW_NOT_FOUND",
            EngineError::Validation { .. } => "VALIDATION_ERROR",
            EngineError::Task(err) => err.code.as_deref().unwrap_or("UNEXPECTED_ERROR"),
            EngineError::Unexpected { .. } => "UNEXPECTED_ERROR",
        }
    }

    pub fn task_type(&self) -> Option<&str> {
        match self {
            EngineError::HandlerNotFound { task_type } => Some(task_type),
            EngineError::Validation { task_type, .. } => Some(task_type),
            EngineError::Task(err) => err.task_type.as_deref(),
            EngineError::Unexpected { task_type, .. } => Some(task_type),
        }
    }

    pub fn execution_id(&self) -> Option<&str> {
        match self {
            EngineError::HandlerNotFound { .. } => None,
            EngineError::Validation { execution_id, .. } => Some(execution_id),
            EngineError::Task(err) => err.execution_id.as_deref(),
            EngineError::Unexpected { execution_id, .. } => Some(execution_id),
        }
    }

    /// True for failures caused by the caller's input (unknown type,
    /// rejected payload) as opposed to failures inside handler logic.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            EngineError::HandlerNotFound { .. } | EngineError::Validation { .. }
        )
    }
}
