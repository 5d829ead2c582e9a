//! Task registry types.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_stream::Stream;
use tracing::warn;

use veogen_core::{TaskEvent, TaskId};

/// Configuration for the task registry.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Maximum concurrent subscribers per task.
    pub max_subscribers: usize,
    /// Event broadcast channel capacity.
    pub broadcast_capacity: usize,
    /// How long a finished task's terminal event is kept for late subscribers.
    pub terminal_retention: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_subscribers: 16,
            broadcast_capacity: 256,
            terminal_retention: Duration::from_secs(60),
        }
    }
}

/// A listener attached to one task's event stream.
///
/// Yields progress events in publication order, then exactly one terminal
/// event, then nothing.
#[derive(Debug)]
pub struct TaskSubscription {
    task_id: TaskId,
    /// Terminal event handed to a subscriber that arrived after termination.
    replay: Option<TaskEvent>,
    event_rx: Option<broadcast::Receiver<TaskEvent>>,
}

impl TaskSubscription {
    pub(crate) const fn live(task_id: TaskId, event_rx: broadcast::Receiver<TaskEvent>) -> Self {
        Self {
            task_id,
            replay: None,
            event_rx: Some(event_rx),
        }
    }

    pub(crate) const fn finished(task_id: TaskId, terminal: TaskEvent) -> Self {
        Self {
            task_id,
            replay: Some(terminal),
            event_rx: None,
        }
    }

    pub const fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Next event, or `None` once the terminal event has been returned.
    pub async fn recv(&mut self) -> Option<TaskEvent> {
        if let Some(event) = self.replay.take() {
            return Some(event);
        }
        let event_rx = self.event_rx.as_mut()?;
        loop {
            match event_rx.recv().await {
                Ok(event) => {
                    if event.is_terminal() {
                        self.event_rx = None;
                    }
                    return Some(event);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(task_id = %self.task_id, skipped, "Subscriber lagged, skipped events");
                }
                Err(RecvError::Closed) => {
                    self.event_rx = None;
                    return None;
                }
            }
        }
    }

    /// Skip progress and wait for the terminal event.
    pub async fn wait_terminal(mut self) -> Option<TaskEvent> {
        while let Some(event) = self.recv().await {
            if event.is_terminal() {
                return Some(event);
            }
        }
        None
    }

    /// Convert into a stream that ends after the terminal event.
    pub fn into_stream(mut self) -> impl Stream<Item = TaskEvent> + Send {
        async_stream::stream! {
            while let Some(event) = self.recv().await {
                yield event;
            }
        }
    }
}

/// Registry statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    /// Tasks still waiting on the gateway.
    pub active_tasks: usize,
    /// Finished tasks retained for late subscribers.
    pub finished_tasks: usize,
    /// Live subscribers across all tasks.
    pub subscribers: usize,
}

/// Registry errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Task not found: {task_id}")]
    TaskNotFound { task_id: TaskId },

    #[error("Too many subscribers for task {task_id} (max: {max})")]
    TooManySubscribers { task_id: TaskId, max: usize },
}
