use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use sprocket_interfaces::TaskHandler;

/// Concurrent mapping from task-type name to handler instance.
///
/// Registration is last-writer-wins: re-registering a type replaces the
/// previous handler without error. Lookups racing a registration for the
/// same key observe either the old or the new handler, never a torn entry.
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn TaskHandler>>>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a handler under its own task-type name, replacing any
    /// existing registration for that type.
    pub async fn register(&self, handler: Arc<dyn TaskHandler>) {
        let task_type = handler.task_type().to_string();
        info!(
            task_type = %task_type,
            version = handler.version(),
            "registering task handler"
        );

        let mut handlers = self.handlers.write().await;
        if handlers.insert(task_type.clone(), handler).is_some() {
            warn!(task_type = %task_type, "replaced previously registered handler");
        }
    }

    /// Remove the handler for a type; returns whether one was registered.
    pub async fn unregister(&self, task_type: &str) -> bool {
        let mut handlers = self.handlers.write().await;
        let removed = handlers.remove(task_type).is_some();
        if removed {
            info!(task_type, "unregistered task handler");
        }
        removed
    }

    /// Look up the handler for a type. Hot path; takes the read lock only.
    pub async fn get(&self, task_type: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.read().await.get(task_type).cloned()
    }

    pub async fn contains(&self, task_type: &str) -> bool {
        self.handlers.read().await.contains_key(task_type)
    }

    /// Snapshot of type → description for every registered handler.
    pub async fn list_all(&self) -> HashMap<String, String> {
        self.handlers
            .read()
            .await
            .iter()
            .map(|(task_type, handler)| (task_type.clone(), handler.description().to_string()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.handlers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.handlers.read().await.is_empty()
    }
}
