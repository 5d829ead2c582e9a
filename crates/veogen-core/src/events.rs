//! Client-visible task events.
//!
//! A task emits zero or more [`ProgressEvent`]s followed by exactly one
//! terminal event: a [`CompletionRecord`] or a [`FailureRecord`].

use serde::{Deserialize, Serialize};

use crate::task::TaskId;

/// Intermediate progress report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub task_id: TaskId,
    /// 0..=100. Not guaranteed to be monotonic.
    pub percent: u8,
    pub message: String,
}

/// Successful terminal result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    pub task_id: TaskId,
    pub video_url: String,
}

/// Failure category carried on a [`FailureRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    ResponseShape,
    Gateway,
    Io,
    Timeout,
    Config,
    Aborted,
}

/// Failed terminal result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct FailureRecord {
    pub task_id: TaskId,
    pub kind: FailureKind,
    /// User-facing message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_detail: Option<serde_json::Value>,
}

/// Event published to a task's subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TaskEvent {
    Progress(ProgressEvent),
    Complete(CompletionRecord),
    Error(FailureRecord),
}

impl TaskEvent {
    /// Event name on the realtime channel.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Progress(_) => "progress",
            Self::Complete(_) => "complete",
            Self::Error(_) => "error",
        }
    }

    pub fn task_id(&self) -> &TaskId {
        match self {
            Self::Progress(e) => &e.task_id,
            Self::Complete(e) => &e.task_id,
            Self::Error(e) => &e.task_id,
        }
    }

    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }
}
