//! Structured failure raised by task handlers

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Domain failure reported by a handler's `execute` or lifecycle hooks.
///
/// Carries the handler-supplied error code (preserved verbatim by the
/// engine), the task type and execution id of the failing attempt, and an
/// optional detail string. Handlers raise this for failure conditions they
/// detect themselves; structural precondition violations belong in
/// `validate`, which returns false instead.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct TaskError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl TaskError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            task_type: None,
            execution_id: None,
            details: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_task_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = Some(task_type.into());
        self
    }

    pub fn with_execution_id(mut self, execution_id: impl Into<String>) -> Self {
        self.execution_id = Some(execution_id.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Fill task type and execution id if the handler left them unset. The
    /// engine calls this before surfacing the error.
    pub fn contextualize(
        &mut self,
        task_type: impl Into<String>,
        execution_id: impl Into<String>,
    ) {
        if self.task_type.is_none() {
            self.task_type = Some(task_type.into());
        }
        if self.execution_id.is_none() {
            self.execution_id = Some(execution_id.into());
        }
    }
}
