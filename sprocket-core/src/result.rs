//! Result envelope returned after task execution

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Outcome reported by a handler for one execution attempt.
///
/// Every variant is terminal; the persisted-only RUNNING state lives on
/// [`crate::record::ExecutionStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Success,
    Failed,
    PartialSuccess,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Success => "SUCCESS",
            TaskStatus::Failed => "FAILED",
            TaskStatus::PartialSuccess => "PARTIAL_SUCCESS",
            TaskStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome envelope for one execution attempt.
///
/// `execution_id` and `execution_time_ms` are stamped exactly once, by the
/// engine, after the handler returns or fails. Handlers fill status, message
/// and output data; they never set the timing fields themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub execution_id: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub output_data: HashMap<String, Value>,
    #[serde(default = "Utc::now")]
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub execution_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl TaskResult {
    fn base(execution_id: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            execution_id: execution_id.into(),
            status,
            message: None,
            output_data: HashMap::new(),
            completed_at: Utc::now(),
            execution_time_ms: 0,
            error_code: None,
            error_details: None,
        }
    }

    pub fn success(execution_id: impl Into<String>) -> Self {
        let mut result = Self::base(execution_id, TaskStatus::Success);
        result.message = Some("Task executed successfully".to_string());
        result
    }

    pub fn success_with_output(
        execution_id: impl Into<String>,
        output_data: HashMap<String, Value>,
    ) -> Self {
        let mut result = Self::success(execution_id);
        result.output_data = output_data;
        result
    }

    pub fn failed(execution_id: impl Into<String>, message: impl Into<String>) -> Self {
        let mut result = Self::base(execution_id, TaskStatus::Failed);
        result.message = Some(message.into());
        result
    }

    pub fn failed_with_code(
        execution_id: impl Into<String>,
        message: impl Into<String>,
        error_code: impl Into<String>,
    ) -> Self {
        let mut result = Self::failed(execution_id, message);
        result.error_code = Some(error_code.into());
        result
    }

    /// Handler-reported early abort. The engine never imposes cancellation;
    /// this status exists only for a handler that detects it should stop.
    pub fn cancelled(execution_id: impl Into<String>, message: impl Into<String>) -> Self {
        let mut result = Self::base(execution_id, TaskStatus::Cancelled);
        result.message = Some(message.into());
        result
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn add_output(&mut self, key: impl Into<String>, value: Value) {
        self.output_data.insert(key.into(), value);
    }

    pub fn output_value(&self, key: &str) -> Option<&Value> {
        self.output_data.get(key)
    }

    /// True for SUCCESS and PARTIAL_SUCCESS.
    pub fn is_successful(&self) -> bool {
        matches!(self.status, TaskStatus::Success | TaskStatus::PartialSuccess)
    }
}
