//! Task handler capability contract
//!
//! A handler is the unit of pluggable behavior: one implementation per
//! task-type name, registered with the engine's registry and invoked
//! through dynamic dispatch. Handlers are added without modifying the
//! engine, so the contract is a trait object rather than a closed enum.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use sprocket_core::{TaskContext, TaskError, TaskResult};

/// Pluggable execution capability for one task type.
///
/// The engine drives implementations through a fixed lifecycle:
/// `validate` → `before_execution` → `execute` → `after_execution`.
/// `after_execution` runs only when `execute` returned `Ok`; a hook error
/// is treated as an execution failure.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Perform the unit of work. Fail with a [`TaskError`] for any failure
    /// condition the handler detects; conditions `validate` is expected to
    /// catch must not surface here.
    async fn execute(&self, context: &mut TaskContext) -> Result<TaskResult, TaskError>;

    /// Pure, side-effect-free check of structural preconditions on the
    /// input data. Returns false rather than erroring for any detectable
    /// precondition violation.
    fn validate(&self, context: &TaskContext) -> bool;

    /// Unique task-type name this handler is registered under.
    fn task_type(&self) -> &str;

    fn version(&self) -> &str;

    fn description(&self) -> &str;

    /// Advisory scheduling hint only; a false value never blocks async
    /// dispatch.
    fn supports_async(&self) -> bool {
        false
    }

    /// Advisory duration estimate in milliseconds, -1 if unknown. Never
    /// enforced as a timeout.
    fn estimated_duration_ms(&self) -> i64 {
        -1
    }

    /// Setup hook; may seed `context.variables` for `execute`.
    async fn before_execution(&self, _context: &mut TaskContext) -> Result<(), TaskError> {
        Ok(())
    }

    /// Cleanup hook, run only on successful return from `execute`; may
    /// adjust the result before the engine stamps and persists it.
    async fn after_execution(
        &self,
        _context: &mut TaskContext,
        _result: &mut TaskResult,
    ) -> Result<(), TaskError> {
        Ok(())
    }

    /// Snapshot of the handler's identity and advisory metadata.
    fn descriptor(&self) -> HandlerDescriptor {
        HandlerDescriptor {
            task_type: self.task_type().to_string(),
            version: self.version().to_string(),
            description: self.description().to_string(),
            supports_async: self.supports_async(),
            estimated_duration_ms: self.estimated_duration_ms(),
        }
    }
}

/// Identity and advisory metadata describing a registered handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerDescriptor {
    pub task_type: String,
    pub version: String,
    pub description: String,
    pub supports_async: bool,
    pub estimated_duration_ms: i64,
}
