//! Per-task registry state.

use std::time::{Duration, Instant};

use tokio::sync::broadcast;

use veogen_core::TaskEvent;

/// State of one task: its live channel until termination, then the retained
/// terminal event.
pub(crate) struct TaskState {
    /// Broadcast sender; dropped once the terminal event is sent so that
    /// subscribers observe the end of the stream.
    event_tx: Option<broadcast::Sender<TaskEvent>>,
    /// Terminal event, set exactly once.
    terminal: Option<TaskEvent>,
    finished_at: Option<Instant>,
}

impl TaskState {
    pub fn new(broadcast_capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(broadcast_capacity);
        Self {
            event_tx: Some(event_tx),
            terminal: None,
            finished_at: None,
        }
    }

    pub fn subscribe(&self) -> Option<broadcast::Receiver<TaskEvent>> {
        self.event_tx.as_ref().map(broadcast::Sender::subscribe)
    }

    pub fn subscriber_count(&self) -> usize {
        self.event_tx
            .as_ref()
            .map_or(0, broadcast::Sender::receiver_count)
    }

    pub const fn terminal(&self) -> Option<&TaskEvent> {
        self.terminal.as_ref()
    }

    pub const fn is_finished(&self) -> bool {
        self.terminal.is_some()
    }

    /// Send a progress event. Returns the number of receivers reached.
    pub fn send_progress(&self, event: TaskEvent) -> usize {
        self.event_tx
            .as_ref()
            .and_then(|tx| tx.send(event).ok())
            .unwrap_or(0)
    }

    /// Send the terminal event and close the channel. Returns `false` without
    /// sending if a terminal event was already recorded.
    pub fn finish(&mut self, event: TaskEvent) -> bool {
        if self.terminal.is_some() {
            return false;
        }
        if let Some(tx) = self.event_tx.take() {
            let _ = tx.send(event.clone());
        }
        self.terminal = Some(event);
        self.finished_at = Some(Instant::now());
        true
    }

    pub fn expired(&self, retention: Duration) -> bool {
        self.finished_at
            .is_some_and(|at| at.elapsed() >= retention)
    }
}
