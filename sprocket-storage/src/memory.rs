//! In-memory execution record repository

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use sprocket_core::{ExecutionRecord, ExecutionStatus, TaskContext, TaskResult};
use sprocket_interfaces::{ExecutionRepository, StorageError};

/// Reference implementation of the persistence contract, keyed by
/// execution id.
///
/// `save_execution_result` upserts: when a start record exists the
/// terminal fields are merged into it, otherwise a fresh record is
/// created. Saving the same result twice leaves one logically terminal
/// record.
pub struct InMemoryExecutionRepository {
    records: RwLock<HashMap<String, ExecutionRecord>>,
}

impl Default for InMemoryExecutionRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryExecutionRepository {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ExecutionRepository for InMemoryExecutionRepository {
    async fn save_execution_start(
        &self,
        context: &TaskContext,
    ) -> Result<ExecutionRecord, StorageError> {
        let record = ExecutionRecord::started(context);
        debug!(execution_id = %record.execution_id, "saved execution start");
        self.records
            .write()
            .await
            .insert(record.execution_id.clone(), record.clone());
        Ok(record)
    }

    async fn save_execution_result(
        &self,
        result: &TaskResult,
    ) -> Result<ExecutionRecord, StorageError> {
        let mut records = self.records.write().await;
        let record = match records.get_mut(&result.execution_id) {
            Some(existing) => {
                existing.apply_result(result);
                existing.clone()
            }
            None => {
                let record = ExecutionRecord::from_result(result);
                records.insert(record.execution_id.clone(), record.clone());
                record
            }
        };
        debug!(
            execution_id = %record.execution_id,
            status = %record.status,
            "saved execution result"
        );
        Ok(record)
    }

    async fn find_by_execution_id(
        &self,
        execution_id: &str,
    ) -> Result<Option<ExecutionRecord>, StorageError> {
        Ok(self.records.read().await.get(execution_id).cloned())
    }

    async fn find_by_task_type(
        &self,
        task_type: &str,
    ) -> Result<Vec<ExecutionRecord>, StorageError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|record| record.task_type == task_type)
            .cloned()
            .collect())
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<ExecutionRecord>, StorageError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|record| record.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect())
    }

    async fn find_by_status(
        &self,
        status: ExecutionStatus,
    ) -> Result<Vec<ExecutionRecord>, StorageError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|record| record.status == status)
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<ExecutionRecord>, StorageError> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn update_status(
        &self,
        execution_id: &str,
        status: ExecutionStatus,
    ) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        match records.get_mut(execution_id) {
            Some(record) => {
                record.status = status;
                record.updated_at = chrono::Utc::now();
                Ok(())
            }
            None => Err(StorageError::NotFound {
                execution_id: execution_id.to_string(),
            }),
        }
    }

    async fn delete_by_execution_id(&self, execution_id: &str) -> Result<bool, StorageError> {
        Ok(self.records.write().await.remove(execution_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(task_type: &str) -> TaskContext {
        let mut input = HashMap::new();
        input.insert("a".to_string(), json!(1));
        TaskContext::new(task_type, input)
    }

    #[tokio::test]
    async fn test_start_then_result_merges_one_record() {
        let repository = InMemoryExecutionRepository::new();
        let ctx = context("ECHO");
        let execution_id = ctx.execution_id().to_string();

        repository.save_execution_start(&ctx).await.unwrap();
        let running = repository
            .find_by_execution_id(&execution_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(running.status, ExecutionStatus::Running);

        let mut result = TaskResult::success(&execution_id);
        result.add_output("a", json!(1));
        repository.save_execution_result(&result).await.unwrap();

        assert_eq!(repository.len().await, 1);
        let terminal = repository
            .find_by_execution_id(&execution_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(terminal.status, ExecutionStatus::Success);
        // The start-record snapshot of the input survives the merge
        assert_eq!(terminal.input_data.get("a"), Some(&json!(1)));
        assert_eq!(terminal.output_data.get("a"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_result_save_is_idempotent() {
        let repository = InMemoryExecutionRepository::new();
        let result = TaskResult::failed_with_code("exec-1", "boom", "ECHO_ERROR");

        repository.save_execution_result(&result).await.unwrap();
        repository.save_execution_result(&result).await.unwrap();

        assert_eq!(repository.len().await, 1);
        let record = repository
            .find_by_execution_id("exec-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, ExecutionStatus::Failed);
        assert_eq!(record.error_code.as_deref(), Some("ECHO_ERROR"));
    }

    #[tokio::test]
    async fn test_output_data_round_trip() {
        let repository = InMemoryExecutionRepository::new();
        let mut output = HashMap::new();
        output.insert("a".to_string(), json!(1));
        let result = TaskResult::success_with_output("exec-2", output.clone());

        repository.save_execution_result(&result).await.unwrap();
        let record = repository
            .find_by_execution_id("exec-2")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.output_data, output);
    }

    #[tokio::test]
    async fn test_query_surface() {
        let repository = InMemoryExecutionRepository::new();

        let ctx_a = context("ECHO").with_user_id("alice");
        let ctx_b = context("NOTIFICATION").with_user_id("bob");
        repository.save_execution_start(&ctx_a).await.unwrap();
        repository.save_execution_start(&ctx_b).await.unwrap();
        repository
            .save_execution_result(&TaskResult::success(ctx_b.execution_id()))
            .await
            .unwrap();

        assert_eq!(repository.find_by_task_type("ECHO").await.unwrap().len(), 1);
        assert_eq!(repository.find_by_user_id("bob").await.unwrap().len(), 1);
        assert_eq!(
            repository
                .find_by_status(ExecutionStatus::Running)
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(repository.find_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_status_and_delete() {
        let repository = InMemoryExecutionRepository::new();
        let ctx = context("ECHO");
        let execution_id = ctx.execution_id().to_string();
        repository.save_execution_start(&ctx).await.unwrap();

        repository
            .update_status(&execution_id, ExecutionStatus::Cancelled)
            .await
            .unwrap();
        let record = repository
            .find_by_execution_id(&execution_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, ExecutionStatus::Cancelled);

        assert!(repository
            .update_status("unknown", ExecutionStatus::Failed)
            .await
            .is_err());

        assert!(repository.delete_by_execution_id(&execution_id).await.unwrap());
        assert!(!repository.delete_by_execution_id(&execution_id).await.unwrap());
        assert!(repository.is_empty().await);
    }
}
