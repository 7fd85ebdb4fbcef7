//! Task context carried through one execution attempt

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

fn generate_execution_id() -> String {
    Uuid::new_v4().to_string()
}

/// Carrier of input data, identity, and per-attempt scratch space for one
/// task execution.
///
/// A context is created per execution attempt and discarded afterwards; it
/// is never reused across attempts. The execution id is generated at
/// construction (or supplied through [`TaskContext::with_execution_id`]
/// before the attempt starts) and is immutable from then on. `input_data`
/// and `metadata` are read-only from a handler's perspective; `variables`
/// is the mutable scratch space shared by the lifecycle hooks of a single
/// invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskContext {
    #[serde(default = "generate_execution_id")]
    execution_id: String,

    #[serde(default)]
    task_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,

    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,

    #[serde(default)]
    input_data: HashMap<String, Value>,

    #[serde(default)]
    metadata: HashMap<String, Value>,

    #[serde(default)]
    variables: HashMap<String, Value>,
}

impl TaskContext {
    /// Create a context for the given task type with the caller's payload.
    pub fn new(task_type: impl Into<String>, input_data: HashMap<String, Value>) -> Self {
        Self {
            execution_id: generate_execution_id(),
            task_type: task_type.into(),
            user_id: None,
            created_at: Utc::now(),
            input_data,
            metadata: HashMap::new(),
            variables: HashMap::new(),
        }
    }

    /// Override the generated execution id. Construction-time only; the id
    /// is immutable once the attempt starts.
    pub fn with_execution_id(mut self, execution_id: impl Into<String>) -> Self {
        self.execution_id = execution_id.into();
        self
    }

    /// Attach the submitting user's identity.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Add a metadata entry. Metadata is passed through unmodified.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn task_type(&self) -> &str {
        &self.task_type
    }

    /// Overwrite the task type. The engine stamps the type actually invoked
    /// at dispatch time, regardless of what the caller set.
    pub fn set_task_type(&mut self, task_type: impl Into<String>) {
        self.task_type = task_type.into();
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn input_data(&self) -> &HashMap<String, Value> {
        &self.input_data
    }

    /// Look up a single input value by key.
    pub fn input_value(&self, key: &str) -> Option<&Value> {
        self.input_data.get(key)
    }

    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    pub fn variables(&self) -> &HashMap<String, Value> {
        &self.variables
    }

    /// Read a scratch variable written by an earlier lifecycle phase.
    pub fn variable(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    /// Write a scratch variable visible to the later phases of the same
    /// attempt. Variables are not persisted and not visible across attempts.
    pub fn set_variable(&mut self, key: impl Into<String>, value: Value) {
        self.variables.insert(key.into(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_generates_execution_id() {
        let a = TaskContext::new("ECHO", HashMap::new());
        let b = TaskContext::new("ECHO", HashMap::new());
        assert!(!a.execution_id().is_empty());
        assert_ne!(a.execution_id(), b.execution_id());
    }

    #[test]
    fn test_context_builder() {
        let mut input = HashMap::new();
        input.insert("x".to_string(), json!(1));

        let ctx = TaskContext::new("DATA_PROCESSING", input)
            .with_execution_id("exec-1")
            .with_user_id("user-42")
            .with_metadata("source", json!("api"));

        assert_eq!(ctx.execution_id(), "exec-1");
        assert_eq!(ctx.task_type(), "DATA_PROCESSING");
        assert_eq!(ctx.user_id(), Some("user-42"));
        assert_eq!(ctx.input_value("x"), Some(&json!(1)));
        assert_eq!(ctx.metadata_value("source"), Some(&json!("api")));
        assert!(ctx.variables().is_empty());
    }

    #[test]
    fn test_scratch_variables() {
        let mut ctx = TaskContext::new("ECHO", HashMap::new());
        assert!(ctx.variable("attempt").is_none());

        ctx.set_variable("attempt", json!(3));
        assert_eq!(ctx.variable("attempt"), Some(&json!(3)));

        ctx.set_variable("attempt", json!(4));
        assert_eq!(ctx.variable("attempt"), Some(&json!(4)));
    }

    #[test]
    fn test_engine_overwrites_task_type() {
        let mut ctx = TaskContext::new("WHATEVER", HashMap::new());
        ctx.set_task_type("NOTIFICATION");
        assert_eq!(ctx.task_type(), "NOTIFICATION");
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let ctx: TaskContext = serde_json::from_str(r#"{"task_type":"ECHO"}"#).unwrap();
        assert!(!ctx.execution_id().is_empty());
        assert!(ctx.input_data().is_empty());
        assert!(ctx.metadata().is_empty());
        assert!(ctx.variables().is_empty());
    }
}
