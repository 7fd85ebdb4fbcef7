//! Persisted execution record and status mapping

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use crate::context::TaskContext;
use crate::result::{TaskResult, TaskStatus};

/// Status of a persisted execution record.
///
/// RUNNING is persisted-only: it marks the start record written after
/// validation and before handler logic runs. Every [`TaskStatus`] maps
/// one-to-one onto a terminal variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Running,
    Success,
    Failed,
    PartialSuccess,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Running => "RUNNING",
            ExecutionStatus::Success => "SUCCESS",
            ExecutionStatus::Failed => "FAILED",
            ExecutionStatus::PartialSuccess => "PARTIAL_SUCCESS",
            ExecutionStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Total by match exhaustiveness: adding a TaskStatus variant without a
// counterpart here fails compilation, not a running engine.
impl From<TaskStatus> for ExecutionStatus {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Success => ExecutionStatus::Success,
            TaskStatus::Failed => ExecutionStatus::Failed,
            TaskStatus::PartialSuccess => ExecutionStatus::PartialSuccess,
            TaskStatus::Cancelled => ExecutionStatus::Cancelled,
        }
    }
}

/// Execution record handed to the persistence collaborator.
///
/// The engine writes it twice per attempt at most: once as a RUNNING start
/// record (after validation), once with the terminal outcome. Storage
/// implementations upsert by `execution_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub execution_id: String,
    pub task_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub input_data: HashMap<String, Value>,
    #[serde(default)]
    pub output_data: HashMap<String, Value>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl ExecutionRecord {
    /// Build the RUNNING start record from a validated context.
    pub fn started(context: &TaskContext) -> Self {
        let now = Utc::now();
        Self {
            execution_id: context.execution_id().to_string(),
            task_type: context.task_type().to_string(),
            user_id: context.user_id().map(str::to_string),
            status: ExecutionStatus::Running,
            input_data: context.input_data().clone(),
            output_data: HashMap::new(),
            metadata: context.metadata().clone(),
            error_code: None,
            error_message: None,
            error_details: None,
            execution_time_ms: None,
            created_at: context.created_at(),
            completed_at: None,
            updated_at: now,
        }
    }

    /// Build a terminal record from a result when no start record exists.
    pub fn from_result(result: &TaskResult) -> Self {
        let now = Utc::now();
        let mut record = Self {
            execution_id: result.execution_id.clone(),
            task_type: String::new(),
            user_id: None,
            status: result.status.into(),
            input_data: HashMap::new(),
            output_data: HashMap::new(),
            metadata: HashMap::new(),
            error_code: None,
            error_message: None,
            error_details: None,
            execution_time_ms: None,
            created_at: now,
            completed_at: None,
            updated_at: now,
        };
        record.apply_result(result);
        record
    }

    /// Merge the terminal outcome into this record.
    pub fn apply_result(&mut self, result: &TaskResult) {
        self.status = result.status.into();
        self.output_data = result.output_data.clone();
        self.error_code = result.error_code.clone();
        self.error_message = result.message.clone();
        self.error_details = result.error_details.clone();
        self.execution_time_ms = Some(result.execution_time_ms);
        self.completed_at = Some(result.completed_at);
        self.updated_at = Utc::now();
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
