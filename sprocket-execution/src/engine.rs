//! The execution core

use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use sprocket_core::{TaskContext, TaskError, TaskResult};
use sprocket_interfaces::{ExecutionRepository, HandlerDescriptor, TaskHandler};
use sprocket_registry::HandlerRegistry;

use crate::dispatch::{DispatchConfig, DispatchPool, ExecutionHandle};
use crate::error::EngineError;

/// Counters describing an engine's lifetime activity.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineMetrics {
    pub tasks_executed: u64,
    pub tasks_failed: u64,
}

impl EngineMetrics {
    /// Fraction of attempts that completed without a failure (1.0 when
    /// nothing ran yet).
    pub fn success_rate(&self) -> f64 {
        let total = self.tasks_executed + self.tasks_failed;
        if total == 0 {
            1.0
        } else {
            self.tasks_executed as f64 / total as f64
        }
    }
}

struct EngineInner {
    registry: Arc<HandlerRegistry>,
    repository: Arc<dyn ExecutionRepository>,
    pool: DispatchPool,
    tasks_executed: AtomicU64,
    tasks_failed: AtomicU64,
}

/// Orchestrates one execution attempt end-to-end: resolve the handler,
/// stamp the context, validate, record the start, drive the lifecycle
/// hooks, normalize the outcome, persist the terminal record, and hand the
/// result (or structured error) back to the caller.
///
/// The engine owns no global state: registry and repository are injected,
/// so multiple isolated engines can coexist in one process. Cloning is
/// cheap and shares the same registry, repository and dispatch pool.
#[derive(Clone)]
pub struct ExecutionEngine {
    inner: Arc<EngineInner>,
}

impl ExecutionEngine {
    pub fn new(registry: Arc<HandlerRegistry>, repository: Arc<dyn ExecutionRepository>) -> Self {
        Self::with_config(registry, repository, DispatchConfig::default())
    }

    pub fn with_config(
        registry: Arc<HandlerRegistry>,
        repository: Arc<dyn ExecutionRepository>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                registry,
                repository,
                pool: DispatchPool::new(config),
                tasks_executed: AtomicU64::new(0),
                tasks_failed: AtomicU64::new(0),
            }),
        }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.inner.registry
    }

    pub async fn register_handler(&self, handler: Arc<dyn TaskHandler>) {
        self.inner.registry.register(handler).await;
    }

    pub async fn unregister_handler(&self, task_type: &str) -> bool {
        self.inner.registry.unregister(task_type).await
    }

    /// Execute a task inline, blocking the caller for the full
    /// validate + hooks + execute duration.
    pub async fn execute(
        &self,
        task_type: &str,
        context: TaskContext,
    ) -> Result<TaskResult, EngineError> {
        run_attempt(&self.inner, task_type, context).await
    }

    /// Dispatch a task onto the worker pool and return an awaitable
    /// handle. An unknown task type fails here, before anything is queued.
    /// A handler that does not advertise async support is still dispatched;
    /// the flag is advisory and only draws a warning.
    pub async fn execute_async(
        &self,
        task_type: &str,
        context: TaskContext,
    ) -> Result<ExecutionHandle, EngineError> {
        let handler = self.lookup(task_type).await?;
        if !handler.supports_async() {
            warn!(
                task_type,
                "handler does not advertise async execution; dispatching anyway"
            );
        }

        let execution_id = context.execution_id().to_string();
        let (sender, receiver) = oneshot::channel();
        let inner = Arc::clone(&self.inner);
        let owned_type = task_type.to_string();

        self.inner
            .pool
            .submit(async move {
                let outcome = run_attempt(&inner, &owned_type, context).await;
                if sender.send(outcome).is_err() {
                    debug!(task_type = %owned_type, "execution handle dropped before completion");
                }
            })
            .map_err(|closed| EngineError::Unexpected {
                task_type: task_type.to_string(),
                execution_id: execution_id.clone(),
                details: closed.to_string(),
            })?;

        Ok(ExecutionHandle::new(
            execution_id,
            task_type.to_string(),
            receiver,
        ))
    }

    /// Run the handler's validation only: no stamping, no hooks, no
    /// persistence.
    pub async fn validate_only(
        &self,
        task_type: &str,
        context: &TaskContext,
    ) -> Result<bool, EngineError> {
        let handler = self.lookup(task_type).await?;
        Ok(handler.validate(context))
    }

    /// Identity and advisory metadata of the registered handler.
    pub async fn describe(&self, task_type: &str) -> Result<HandlerDescriptor, EngineError> {
        let handler = self.lookup(task_type).await?;
        Ok(handler.descriptor())
    }

    /// Snapshot of registered type → description.
    pub async fn list_registered(&self) -> HashMap<String, String> {
        self.inner.registry.list_all().await
    }

    pub fn metrics(&self) -> EngineMetrics {
        EngineMetrics {
            tasks_executed: self.inner.tasks_executed.load(Ordering::Relaxed),
            tasks_failed: self.inner.tasks_failed.load(Ordering::Relaxed),
        }
    }

    /// Drain the dispatch pool: queued attempts still run, new async
    /// submissions are rejected.
    pub async fn shutdown(&self) {
        self.inner.pool.shutdown().await;
    }

    async fn lookup(&self, task_type: &str) -> Result<Arc<dyn TaskHandler>, EngineError> {
        self.inner.registry.get(task_type).await.ok_or_else(|| {
            warn!(task_type, "no handler registered for task type");
            EngineError::HandlerNotFound {
                task_type: task_type.to_string(),
            }
        })
    }
}

/// One end-to-end attempt. Sequential; no internal parallelism.
async fn run_attempt(
    inner: &EngineInner,
    task_type: &str,
    mut context: TaskContext,
) -> Result<TaskResult, EngineError> {
    // Resolve. A miss has no side effects at all.
    let handler = match inner.registry.get(task_type).await {
        Some(handler) => handler,
        None => {
            warn!(task_type, "no handler registered for task type");
            return Err(EngineError::HandlerNotFound {
                task_type: task_type.to_string(),
            });
        }
    };

    // Stamp the type actually invoked, whatever the caller set.
    context.set_task_type(task_type);
    let execution_id = context.execution_id().to_string();
    info!(task_type, execution_id = %execution_id, "executing task");
    let started = Instant::now();

    // Validate. Rejections are local: no start record, no terminal record.
    if !handler.validate(&context) {
        warn!(task_type, execution_id = %execution_id, "task context validation failed");
        return Err(EngineError::Validation {
            task_type: task_type.to_string(),
            execution_id,
            message: "task context validation failed".to_string(),
        });
    }

    // Past this point the attempt counts as started. The start record is
    // fire-and-forget: a storage error must not fail the attempt.
    if let Err(err) = inner.repository.save_execution_start(&context).await {
        warn!(
            task_type,
            execution_id = %execution_id,
            error = %err,
            "failed to record execution start"
        );
    }

    let phases = run_phases(handler.as_ref(), &mut context);
    let outcome = AssertUnwindSafe(phases).catch_unwind().await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(Ok(mut result)) => {
            // Timing and identity are stamped here, never by the handler.
            result.execution_id = execution_id.clone();
            result.execution_time_ms = elapsed_ms;
            persist_result(inner, &result).await;
            inner.tasks_executed.fetch_add(1, Ordering::Relaxed);
            info!(
                task_type,
                execution_id = %execution_id,
                elapsed_ms,
                status = %result.status,
                "task completed"
            );
            Ok(result)
        }
        Ok(Err(mut task_error)) => {
            task_error.contextualize(task_type, &execution_id);
            let code = task_error
                .code
                .clone()
                .unwrap_or_else(|| "UNEXPECTED_ERROR".to_string());
            let mut result =
                TaskResult::failed_with_code(&execution_id, task_error.message.clone(), code);
            result.execution_time_ms = elapsed_ms;
            result.error_details = task_error.details.clone();
            persist_result(inner, &result).await;
            inner.tasks_failed.fetch_add(1, Ordering::Relaxed);
            error!(
                task_type,
                execution_id = %execution_id,
                elapsed_ms,
                error = %task_error,
                "task failed"
            );
            Err(EngineError::Task(task_error))
        }
        Err(panic) => {
            let details = panic_message(panic);
            let mut result = TaskResult::failed_with_code(
                &execution_id,
                "unexpected error during task execution",
                "UNEXPECTED_ERROR",
            );
            result.execution_time_ms = elapsed_ms;
            result.error_details = Some(details.clone());
            persist_result(inner, &result).await;
            inner.tasks_failed.fetch_add(1, Ordering::Relaxed);
            error!(
                task_type,
                execution_id = %execution_id,
                elapsed_ms,
                details = %details,
                "task panicked"
            );
            Err(EngineError::Unexpected {
                task_type: task_type.to_string(),
                execution_id,
                details,
            })
        }
    }
}

/// before → execute → after. The after-hook runs only on a successful
/// return from execute; a hook error fails the attempt like any other
/// domain error.
async fn run_phases(
    handler: &dyn TaskHandler,
    context: &mut TaskContext,
) -> Result<TaskResult, TaskError> {
    handler.before_execution(context).await?;
    let mut result = handler.execute(context).await?;
    handler.after_execution(context, &mut result).await?;
    Ok(result)
}

/// Terminal record write; unconditional for every started attempt. A
/// storage error is logged and never masks the execution outcome.
async fn persist_result(inner: &EngineInner, result: &TaskResult) {
    if let Err(err) = inner.repository.save_execution_result(result).await {
        error!(
            execution_id = %result.execution_id,
            error = %err,
            "failed to record execution result"
        );
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use sprocket_core::ExecutionStatus;
    use sprocket_storage::InMemoryExecutionRepository;

    struct EchoHandler;

    #[async_trait]
    impl TaskHandler for EchoHandler {
        async fn execute(&self, context: &mut TaskContext) -> Result<TaskResult, TaskError> {
            Ok(TaskResult::success_with_output(
                context.execution_id(),
                context.input_data().clone(),
            ))
        }

        fn validate(&self, _context: &TaskContext) -> bool {
            true
        }

        fn task_type(&self) -> &str {
            "ECHO"
        }

        fn version(&self) -> &str {
            "1.0.0"
        }

        fn description(&self) -> &str {
            "Echoes its input data"
        }

        fn supports_async(&self) -> bool {
            true
        }
    }

    struct RejectingHandler;

    #[async_trait]
    impl TaskHandler for RejectingHandler {
        async fn execute(&self, context: &mut TaskContext) -> Result<TaskResult, TaskError> {
            Ok(TaskResult::success(context.execution_id()))
        }

        fn validate(&self, _context: &TaskContext) -> bool {
            false
        }

        fn task_type(&self) -> &str {
            "REJECTING"
        }

        fn version(&self) -> &str {
            "1.0.0"
        }

        fn description(&self) -> &str {
            "Rejects every context"
        }
    }

    struct PanickingHandler;

    #[async_trait]
    impl TaskHandler for PanickingHandler {
        async fn execute(&self, _context: &mut TaskContext) -> Result<TaskResult, TaskError> {
            panic!("wires crossed");
        }

        fn validate(&self, _context: &TaskContext) -> bool {
            true
        }

        fn task_type(&self) -> &str {
            "PANICKING"
        }

        fn version(&self) -> &str {
            "1.0.0"
        }

        fn description(&self) -> &str {
            "Panics mid-execution"
        }
    }

    async fn engine_with(
        handlers: Vec<Arc<dyn TaskHandler>>,
    ) -> (ExecutionEngine, Arc<InMemoryExecutionRepository>) {
        let registry = Arc::new(HandlerRegistry::new());
        for handler in handlers {
            registry.register(handler).await;
        }
        let repository = Arc::new(InMemoryExecutionRepository::new());
        let engine = ExecutionEngine::with_config(
            registry,
            repository.clone(),
            DispatchConfig { worker_count: 2 },
        );
        (engine, repository)
    }

    #[tokio::test]
    async fn test_execute_success_stamps_result() {
        let (engine, repository) = engine_with(vec![Arc::new(EchoHandler)]).await;

        let mut input = HashMap::new();
        input.insert("x".to_string(), json!(1));
        let context = TaskContext::new("ECHO", input);
        let execution_id = context.execution_id().to_string();

        let result = engine.execute("ECHO", context).await.unwrap();
        assert_eq!(result.execution_id, execution_id);
        assert!(result.is_successful());
        assert_eq!(result.output_value("x"), Some(&json!(1)));

        let record = repository
            .find_by_execution_id(&execution_id)
            .await
            .unwrap()
            .expect("terminal record persisted");
        assert_eq!(record.status, ExecutionStatus::Success);
        assert_eq!(engine.metrics().tasks_executed, 1);
    }

    #[tokio::test]
    async fn test_unknown_type_has_no_side_effects() {
        let (engine, repository) = engine_with(vec![]).await;
        let context = TaskContext::new("MISSING", HashMap::new());

        let err = engine.execute("MISSING", context).await.unwrap_err();
        assert_eq!(err.error_code(), "WORKFLOW_NOT_FOUND");
        assert!(repository.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validation_failure_persists_nothing() {
        let (engine, repository) = engine_with(vec![Arc::new(RejectingHandler)]).await;
        let context = TaskContext::new("REJECTING", HashMap::new());

        let err = engine.execute("REJECTING", context).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("validation failed"));
        assert!(repository.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_panic_is_normalized() {
        let (engine, repository) = engine_with(vec![Arc::new(PanickingHandler)]).await;
        let context = TaskContext::new("PANICKING", HashMap::new());
        let execution_id = context.execution_id().to_string();

        let err = engine.execute("PANICKING", context).await.unwrap_err();
        assert_eq!(err.error_code(), "UNEXPECTED_ERROR");
        match &err {
            EngineError::Unexpected { details, .. } => assert_eq!(details, "wires crossed"),
            other => panic!("expected Unexpected, got {other:?}"),
        }

        let record = repository
            .find_by_execution_id(&execution_id)
            .await
            .unwrap()
            .expect("failure persisted");
        assert_eq!(record.status, ExecutionStatus::Failed);
        assert_eq!(record.error_code.as_deref(), Some("UNEXPECTED_ERROR"));
        assert_eq!(engine.metrics().tasks_failed, 1);
    }

    #[tokio::test]
    async fn test_describe_and_validate_only() {
        let (engine, repository) = engine_with(vec![Arc::new(EchoHandler)]).await;

        let descriptor = engine.describe("ECHO").await.unwrap();
        assert_eq!(descriptor.task_type, "ECHO");
        assert!(descriptor.supports_async);
        assert_eq!(descriptor.estimated_duration_ms, -1);

        let context = TaskContext::new("ECHO", HashMap::new());
        assert!(engine.validate_only("ECHO", &context).await.unwrap());
        assert!(engine.describe("MISSING").await.is_err());

        // validate_only leaves no trace
        assert!(repository.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_execute_async_round_trip() {
        let (engine, _repository) = engine_with(vec![Arc::new(EchoHandler)]).await;

        let mut input = HashMap::new();
        input.insert("n".to_string(), json!(7));
        let context = TaskContext::new("ECHO", input);

        let handle = engine.execute_async("ECHO", context).await.unwrap();
        let result = handle.join().await.unwrap();
        assert_eq!(result.output_value("n"), Some(&json!(7)));
    }

    #[tokio::test]
    async fn test_execute_async_unknown_type_fails_before_dispatch() {
        let (engine, _repository) = engine_with(vec![]).await;
        let context = TaskContext::new("MISSING", HashMap::new());

        let err = engine.execute_async("MISSING", context).await.unwrap_err();
        assert!(matches!(err, EngineError::HandlerNotFound { .. }));
    }

    #[tokio::test]
    async fn test_metrics_success_rate() {
        let metrics = EngineMetrics {
            tasks_executed: 97,
            tasks_failed: 3,
        };
        assert!((metrics.success_rate() - 0.97).abs() < 1e-9);
        assert!((EngineMetrics::default().success_rate() - 1.0).abs() < 1e-9);
    }
}
