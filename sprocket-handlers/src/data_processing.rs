//! Batch data aggregation handler

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info};

use sprocket_core::{TaskContext, TaskError, TaskResult};
use sprocket_interfaces::TaskHandler;

const ERROR_CODE: &str = "DATA_PROCESSING_ERROR";

/// Validates, normalizes and aggregates a list of records.
///
/// Expects `input_data["data"]` to be a list of objects, each carrying a
/// `value` field. Numeric values are normalized to f64; non-numeric values
/// count as 0.0 in the aggregates. Output: record count, total and average
/// value.
pub struct DataProcessingHandler;

#[async_trait]
impl TaskHandler for DataProcessingHandler {
    async fn execute(&self, context: &mut TaskContext) -> Result<TaskResult, TaskError> {
        info!(execution_id = %context.execution_id(), "starting data processing");

        let records = match context.input_value("data").and_then(Value::as_array) {
            Some(records) => records.clone(),
            None => {
                // validate() catches this; reaching it means the handler was
                // driven outside the engine lifecycle
                return Err(
                    TaskError::new("input field 'data' must be a list").with_code(ERROR_CODE)
                );
            }
        };

        if records.is_empty() {
            return Err(TaskError::new("input data list cannot be empty").with_code(ERROR_CODE));
        }

        let mut total = 0.0_f64;
        for (index, record) in records.iter().enumerate() {
            let value = record.get("value").ok_or_else(|| {
                TaskError::new("each record must contain a 'value' field")
                    .with_code(ERROR_CODE)
                    .with_details(format!("record {index} has no 'value'"))
            })?;
            total += value.as_f64().unwrap_or(0.0);
        }

        let count = records.len();
        let average = total / count as f64;

        let mut result = TaskResult::success(context.execution_id());
        result.message = Some("Data processing completed successfully".to_string());
        result.add_output("processedRecords", json!(count));
        result.add_output("totalValue", json!(total));
        result.add_output("averageValue", json!(average));

        info!(execution_id = %context.execution_id(), count, "data processing completed");
        Ok(result)
    }

    fn validate(&self, context: &TaskContext) -> bool {
        match context.input_value("data") {
            Some(data) => data.is_array(),
            None => false,
        }
    }

    fn task_type(&self) -> &str {
        "DATA_PROCESSING"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn description(&self) -> &str {
        "Processes input data by validating, transforming, and aggregating records"
    }

    fn supports_async(&self) -> bool {
        true
    }

    fn estimated_duration_ms(&self) -> i64 {
        5000
    }

    async fn before_execution(&self, context: &mut TaskContext) -> Result<(), TaskError> {
        debug!(execution_id = %context.execution_id(), "preparing data processing");
        context.set_variable("start_time", json!(Utc::now().timestamp_millis()));
        Ok(())
    }

    async fn after_execution(
        &self,
        context: &mut TaskContext,
        _result: &mut TaskResult,
    ) -> Result<(), TaskError> {
        if let Some(start) = context.variable("start_time").and_then(Value::as_i64) {
            let duration = Utc::now().timestamp_millis() - start;
            debug!(execution_id = %context.execution_id(), duration, "data processing took");
        }
        Ok(())
    }
}
