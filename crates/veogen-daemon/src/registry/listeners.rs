//! Task registry for per-task event fan-out.
//!
//! Each task can have several subscribers. Events published for a task are
//! broadcast only to that task's subscribers. The terminal event is accepted
//! once per task and retained for subscribers that arrive after it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use veogen_core::{TaskEvent, TaskId};

use super::state::TaskState;
use super::types::{RegistryConfig, RegistryError, RegistryStats, TaskSubscription};

/// Registry of in-flight and recently finished tasks.
pub struct TaskRegistry {
    tasks: Arc<RwLock<HashMap<TaskId, TaskState>>>,
    config: RegistryConfig,
}

impl TaskRegistry {
    /// Create a new registry.
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Create with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(RegistryConfig::default())
    }

    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a task so it can be subscribed to. Registering an id twice
    /// keeps the existing state.
    pub async fn register(&self, task_id: &TaskId) {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(task_id) {
            return;
        }
        tasks.insert(
            task_id.clone(),
            TaskState::new(self.config.broadcast_capacity),
        );
        drop(tasks);
        debug!(%task_id, "Task registered");
    }

    /// Attach a subscriber to a task.
    #[allow(clippy::significant_drop_tightening)]
    pub async fn subscribe(&self, task_id: &TaskId) -> Result<TaskSubscription, RegistryError> {
        let tasks = self.tasks.read().await;
        let task = tasks
            .get(task_id)
            .ok_or_else(|| RegistryError::TaskNotFound {
                task_id: task_id.clone(),
            })?;

        if let Some(terminal) = task.terminal() {
            debug!(%task_id, "Late subscriber receives retained terminal event");
            return Ok(TaskSubscription::finished(task_id.clone(), terminal.clone()));
        }

        if task.subscriber_count() >= self.config.max_subscribers {
            return Err(RegistryError::TooManySubscribers {
                task_id: task_id.clone(),
                max: self.config.max_subscribers,
            });
        }

        let event_rx = task.subscribe().ok_or_else(|| RegistryError::TaskNotFound {
            task_id: task_id.clone(),
        })?;
        debug!(%task_id, "Subscriber attached");
        Ok(TaskSubscription::live(task_id.clone(), event_rx))
    }

    /// Publish an event to a task's subscribers.
    ///
    /// Returns `false` when the event was dropped: the task is unknown, or a
    /// terminal event was already published for it.
    pub async fn publish(&self, event: TaskEvent) -> bool {
        let mut tasks = self.tasks.write().await;
        let task_id = event.task_id().clone();

        let Some(task) = tasks.get_mut(&task_id) else {
            warn!(%task_id, event = event.name(), "Event for unknown task dropped");
            return false;
        };

        if task.is_finished() {
            warn!(%task_id, event = event.name(), "Event after terminal dropped");
            return false;
        }

        if event.is_terminal() {
            let name = event.name();
            let accepted = task.finish(event);
            drop(tasks);
            if accepted {
                info!(%task_id, event = name, "Task finished");
            }
            return accepted;
        }

        let receivers = task.send_progress(event);
        drop(tasks);
        debug!(%task_id, receivers, "Progress broadcast");
        true
    }

    /// Forget a task entirely.
    pub async fn remove(&self, task_id: &TaskId) -> bool {
        self.tasks.write().await.remove(task_id).is_some()
    }

    /// Whether a task is known to the registry.
    pub async fn contains(&self, task_id: &TaskId) -> bool {
        self.tasks.read().await.contains_key(task_id)
    }

    /// Drop finished tasks whose retention window has elapsed.
    pub async fn cleanup_expired(&self) -> Vec<TaskId> {
        let mut tasks = self.tasks.write().await;
        let retention = self.config.terminal_retention;
        let expired: Vec<TaskId> = tasks
            .iter()
            .filter(|(_, task)| task.expired(retention))
            .map(|(id, _)| id.clone())
            .collect();

        for task_id in &expired {
            tasks.remove(task_id);
        }
        drop(tasks);

        if !expired.is_empty() {
            debug!(count = expired.len(), "Expired finished tasks");
        }
        expired
    }

    /// Get registry statistics.
    pub async fn stats(&self) -> RegistryStats {
        let tasks = self.tasks.read().await;
        let finished_tasks = tasks.values().filter(|t| t.is_finished()).count();
        let subscribers = tasks.values().map(TaskState::subscriber_count).sum();

        RegistryStats {
            active_tasks: tasks.len() - finished_tasks,
            finished_tasks,
            subscribers,
        }
    }
}
