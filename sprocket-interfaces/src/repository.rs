//! Execution record persistence contract
//!
//! The engine consumes this contract; it never owns a storage
//! implementation. Different backends (in-memory, database) satisfy the
//! same trait, which keeps the engine testable against fakes.

use async_trait::async_trait;

use sprocket_core::{ExecutionRecord, ExecutionStatus, TaskContext, TaskResult};

/// Storage-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("execution record not found: {execution_id}")]
    NotFound { execution_id: String },

    #[error("constraint violation: {message}")]
    Constraint { message: String },

    #[error("connection error: {message}")]
    Connection { message: String },

    #[error("internal storage error: {message}")]
    Internal { message: String },
}

/// Persistence contract for execution records.
///
/// `save_execution_start` is called at most once per attempt, and only
/// after validation succeeded. `save_execution_result` is terminal and
/// idempotent on `execution_id`: implementations upsert by that key, so a
/// repeated save yields one logically terminal record.
#[async_trait]
pub trait ExecutionRepository: Send + Sync {
    /// Write the RUNNING start record for a validated context.
    async fn save_execution_start(
        &self,
        context: &TaskContext,
    ) -> Result<ExecutionRecord, StorageError>;

    /// Write the terminal outcome, merging into the start record when one
    /// exists.
    async fn save_execution_result(
        &self,
        result: &TaskResult,
    ) -> Result<ExecutionRecord, StorageError>;

    async fn find_by_execution_id(
        &self,
        execution_id: &str,
    ) -> Result<Option<ExecutionRecord>, StorageError>;

    async fn find_by_task_type(
        &self,
        task_type: &str,
    ) -> Result<Vec<ExecutionRecord>, StorageError>;

    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<ExecutionRecord>, StorageError>;

    async fn find_by_status(
        &self,
        status: ExecutionStatus,
    ) -> Result<Vec<ExecutionRecord>, StorageError>;

    async fn find_all(&self) -> Result<Vec<ExecutionRecord>, StorageError>;

    /// Overwrite the status of an existing record.
    async fn update_status(
        &self,
        execution_id: &str,
        status: ExecutionStatus,
    ) -> Result<(), StorageError>;

    /// Remove a record; returns whether one existed.
    async fn delete_by_execution_id(&self, execution_id: &str) -> Result<bool, StorageError>;

    /// Check the backing store is reachable.
    async fn health_check(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
