//! Notification delivery handler

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use sprocket_core::{TaskContext, TaskError, TaskResult};
use sprocket_interfaces::TaskHandler;

const ERROR_CODE: &str = "NOTIFICATION_ERROR";
const CHANNELS: [&str; 3] = ["EMAIL", "SMS", "PUSH"];

/// Sends a notification over one of the supported channels.
///
/// Expects `recipient`, `message` and `type` in the input data, with
/// `type` one of EMAIL, SMS or PUSH. Delivery is simulated.
pub struct NotificationHandler;

impl NotificationHandler {
    async fn send_notification(&self, recipient: &str, message: &str, channel: &str) -> bool {
        info!(channel, recipient, message, "sending notification");
        tokio::time::sleep(Duration::from_millis(10)).await;
        true
    }
}

#[async_trait]
impl TaskHandler for NotificationHandler {
    async fn execute(&self, context: &mut TaskContext) -> Result<TaskResult, TaskError> {
        info!(execution_id = %context.execution_id(), "starting notification delivery");

        let recipient = input_str(context, "recipient")
            .ok_or_else(|| TaskError::new("missing 'recipient' field").with_code(ERROR_CODE))?;
        let message = input_str(context, "message")
            .ok_or_else(|| TaskError::new("missing 'message' field").with_code(ERROR_CODE))?;
        let channel = input_str(context, "type")
            .ok_or_else(|| TaskError::new("missing 'type' field").with_code(ERROR_CODE))?;

        let delivered = self.send_notification(&recipient, &message, &channel).await;
        if !delivered {
            return Err(TaskError::new("failed to send notification").with_code(ERROR_CODE));
        }

        let mut result = TaskResult::success(context.execution_id());
        result.message = Some("Notification sent successfully".to_string());
        result.add_output("recipient", json!(recipient));
        result.add_output("notificationType", json!(channel));
        result.add_output("sentAt", json!(Utc::now().timestamp_millis()));

        info!(execution_id = %context.execution_id(), "notification delivered");
        Ok(result)
    }

    fn validate(&self, context: &TaskContext) -> bool {
        let recipient_ok = input_str(context, "recipient")
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false);
        let message_ok = input_str(context, "message")
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false);
        let channel_ok = input_str(context, "type")
            .map(|value| CHANNELS.contains(&value.as_str()))
            .unwrap_or(false);

        recipient_ok && message_ok && channel_ok
    }

    fn task_type(&self) -> &str {
        "NOTIFICATION"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn description(&self) -> &str {
        "Sends notifications via email, SMS, or push notification"
    }

    fn supports_async(&self) -> bool {
        true
    }

    fn estimated_duration_ms(&self) -> i64 {
        2000
    }

    async fn before_execution(&self, context: &mut TaskContext) -> Result<(), TaskError> {
        debug!(execution_id = %context.execution_id(), "preparing notification delivery");
        if let Some(channel) = input_str(context, "type") {
            context.set_variable("notification_channel", json!(channel));
        }
        Ok(())
    }

    async fn after_execution(
        &self,
        context: &mut TaskContext,
        _result: &mut TaskResult,
    ) -> Result<(), TaskError> {
        if let Some(channel) = context.variable("notification_channel").and_then(Value::as_str) {
            debug!(channel, "notification sent");
        }
        Ok(())
    }
}

fn input_str(context: &TaskContext, key: &str) -> Option<String> {
    context
        .input_value(key)
        .and_then(Value::as_str)
        .map(str::to_string)
}
