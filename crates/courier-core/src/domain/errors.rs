//! Errors - error types and their classification.
//!
//! | error           | where it comes from            | what the poller does            |
//! |-----------------|--------------------------------|---------------------------------|
//! | `QueueError`    | receive / acknowledge          | back off (receive) or log (ack) |
//! | `DispatchError` | decode, lookup, handler        | mark failed + ack (not decode)  |
//! | `StoreError`    | lifecycle writes               | log, leave message un-acked     |

use std::time::Duration;

use thiserror::Error;

use super::{MessageId, TaskStatus, TaskType};

/// Queue transport failure.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue transport error: {0}")]
    Transport(String),

    #[error("stale receipt token for message {0}")]
    StaleReceipt(MessageId),

    #[error("queue is closed")]
    Closed,
}

/// Task store failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task store unavailable: {0}")]
    Unavailable(String),

    #[error("no task row for message {0}")]
    NotFound(MessageId),

    #[error("rejected transition for message {message_id}: {from} -> {to}")]
    Conflict {
        message_id: MessageId,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("task store is closed")]
    Closed,
}

/// Failure reported by a handler.
///
/// `Display` is the handler's own text, verbatim: this is what ends up in the
/// task row's `error_message`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The payload could not be decoded into the handler's input type.
    pub fn invalid_payload(err: impl std::fmt::Display) -> Self {
        Self::new(format!("invalid payload: {err}"))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Outcome classification of a dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The body could not be decoded; there is no task to mark.
    #[error("malformed message body: {0}")]
    Malformed(String),

    #[error("Unknown task type: {0}")]
    UnknownType(TaskType),

    #[error(transparent)]
    HandlerFailed(#[from] HandlerError),

    #[error("handler timed out after {}s", .0.as_secs_f64())]
    TimedOut(Duration),
}

impl DispatchError {
    /// Text persisted as the row's `error_message`.
    pub fn failure_text(&self) -> String {
        self.to_string()
    }
}
