//! Task record: one lifecycle row per delivered message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MessageId, TaskStatus, WorkerId};

/// A rejected state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: TaskStatus,
    pub to: TaskStatus,
}

/// Lifecycle row keyed by `message_id`.
///
/// Design:
/// - All status changes go through the methods below, which refuse anything
///   `TaskStatus::can_transition_to` does not allow.
/// - `result` is only ever set together with `Completed`, `error_message` only
///   with `Failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub message_id: MessageId,
    pub status: TaskStatus,
    pub worker_id: Option<WorkerId>,

    /// Number of times this row has been claimed for processing.
    pub attempts: u32,

    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
}

impl TaskRecord {
    pub fn new(message_id: MessageId) -> Self {
        Self {
            message_id,
            status: TaskStatus::Pending,
            worker_id: None,
            attempts: 0,
            started_at: None,
            completed_at: None,
            result: None,
            error_message: None,
        }
    }

    fn transition(&mut self, to: TaskStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(to) {
            return Err(InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Claim the row for `worker_id` (increments attempts).
    pub fn start_attempt(
        &mut self,
        worker_id: WorkerId,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        self.transition(TaskStatus::Processing)?;
        self.worker_id = Some(worker_id);
        self.attempts += 1;
        self.started_at = Some(now);
        Ok(())
    }

    pub fn mark_completed(
        &mut self,
        result: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        self.transition(TaskStatus::Completed)?;
        self.result = Some(result);
        self.completed_at = Some(now);
        Ok(())
    }

    pub fn mark_failed(
        &mut self,
        error: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        self.transition(TaskStatus::Failed)?;
        self.error_message = Some(error.into());
        self.completed_at = Some(now);
        Ok(())
    }
}
