//! Testing fakes for the persistence contract

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use sprocket_core::{ExecutionRecord, ExecutionStatus, TaskContext, TaskResult};
use sprocket_interfaces::{ExecutionRepository, StorageError};

use crate::memory::InMemoryExecutionRepository;

/// Repository fake that counts save calls and can inject save failures.
///
/// Backed by [`InMemoryExecutionRepository`], so the query surface behaves
/// like the real thing. Used to assert the engine's persistence behavior:
/// zero start records for validation failures, exactly one terminal record
/// per started attempt, and fire-and-forget handling of storage errors.
pub struct RecordingRepository {
    inner: InMemoryExecutionRepository,
    start_calls: AtomicUsize,
    result_calls: AtomicUsize,
    fail_saves: AtomicBool,
}

impl Default for RecordingRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingRepository {
    pub fn new() -> Self {
        Self {
            inner: InMemoryExecutionRepository::new(),
            start_calls: AtomicUsize::new(0),
            result_calls: AtomicUsize::new(0),
            fail_saves: AtomicBool::new(false),
        }
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn result_calls(&self) -> usize {
        self.result_calls.load(Ordering::SeqCst)
    }

    /// Make subsequent save calls fail with an internal storage error.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    fn saves_failing(&self) -> Option<StorageError> {
        self.fail_saves.load(Ordering::SeqCst).then(|| StorageError::Internal {
            message: "injected save failure".to_string(),
        })
    }
}

#[async_trait]
impl ExecutionRepository for RecordingRepository {
    async fn save_execution_start(
        &self,
        context: &TaskContext,
    ) -> Result<ExecutionRecord, StorageError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.saves_failing() {
            return Err(err);
        }
        self.inner.save_execution_start(context).await
    }

    async fn save_execution_result(
        &self,
        result: &TaskResult,
    ) -> Result<ExecutionRecord, StorageError> {
        self.result_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.saves_failing() {
            return Err(err);
        }
        self.inner.save_execution_result(result).await
    }

    async fn find_by_execution_id(
        &self,
        execution_id: &str,
    ) -> Result<Option<ExecutionRecord>, StorageError> {
        self.inner.find_by_execution_id(execution_id).await
    }

    async fn find_by_task_type(
        &self,
        task_type: &str,
    ) -> Result<Vec<ExecutionRecord>, StorageError> {
        self.inner.find_by_task_type(task_type).await
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<ExecutionRecord>, StorageError> {
        self.inner.find_by_user_id(user_id).await
    }

    async fn find_by_status(
        &self,
        status: ExecutionStatus,
    ) -> Result<Vec<ExecutionRecord>, StorageError> {
        self.inner.find_by_status(status).await
    }

    async fn find_all(&self) -> Result<Vec<ExecutionRecord>, StorageError> {
        self.inner.find_all().await
    }

    async fn update_status(
        &self,
        execution_id: &str,
        status: ExecutionStatus,
    ) -> Result<(), StorageError> {
        self.inner.update_status(execution_id, status).await
    }

    async fn delete_by_execution_id(&self, execution_id: &str) -> Result<bool, StorageError> {
        self.inner.delete_by_execution_id(execution_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_counts_save_calls() {
        let repository = RecordingRepository::new();
        let context = TaskContext::new("ECHO", HashMap::new());

        repository.save_execution_start(&context).await.unwrap();
        repository
            .save_execution_result(&TaskResult::success(context.execution_id()))
            .await
            .unwrap();

        assert_eq!(repository.start_calls(), 1);
        assert_eq!(repository.result_calls(), 1);
    }

    #[tokio::test]
    async fn test_injected_failures_still_count() {
        let repository = RecordingRepository::new();
        repository.set_fail_saves(true);

        let context = TaskContext::new("ECHO", HashMap::new());
        assert!(repository.save_execution_start(&context).await.is_err());
        assert_eq!(repository.start_calls(), 1);
        assert!(repository.find_all().await.unwrap().is_empty());
    }
}
