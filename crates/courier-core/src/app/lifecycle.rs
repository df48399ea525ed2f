//! LifecycleTracker - writes the processing / completed / failed transitions
//! for the messages one worker handles.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error};

use crate::domain::{DispatchError, MessageId, StoreError, TaskStatus, WorkerId};
use crate::ports::TaskStore;

/// Result of trying to claim a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The row is now `processing` under this worker.
    Claimed,
    /// The row already reached a terminal status; the handler must not run.
    AlreadyTerminal(TaskStatus),
}

pub struct LifecycleTracker {
    store: Arc<dyn TaskStore>,
    worker_id: WorkerId,
}

impl LifecycleTracker {
    pub fn new(store: Arc<dyn TaskStore>, worker_id: WorkerId) -> Self {
        Self { store, worker_id }
    }

    pub fn worker_id(&self) -> &WorkerId {
        &self.worker_id
    }

    /// Claim `message_id` for this worker.
    ///
    /// A redelivery of a message whose row is already terminal is reported as
    /// `AlreadyTerminal` and leaves the row untouched. A `processing` row left
    /// behind by a crashed worker is reclaimed.
    pub async fn begin(&self, message_id: &MessageId) -> Result<Claim, StoreError> {
        match self.store.status(message_id).await {
            Ok(Some(status)) if status.is_terminal() => {
                return Ok(Claim::AlreadyTerminal(status));
            }
            Ok(_) => {}
            Err(e) => {
                error!(message_id = %message_id, error = %e, "failed to read task status");
                return Err(e);
            }
        }

        match self.mark_processing(message_id).await {
            Ok(()) => Ok(Claim::Claimed),
            // Lost a race against another worker finishing the same message.
            Err(StoreError::Conflict { from, .. }) if from.is_terminal() => {
                Ok(Claim::AlreadyTerminal(from))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn mark_processing(&self, message_id: &MessageId) -> Result<(), StoreError> {
        self.store
            .upsert_processing(message_id, &self.worker_id)
            .await
            .inspect(|_| debug!(message_id = %message_id, "task processing"))
            .inspect_err(|e| {
                error!(message_id = %message_id, error = %e, "failed to mark task processing")
            })
    }

    pub async fn mark_completed(
        &self,
        message_id: &MessageId,
        result: Value,
    ) -> Result<(), StoreError> {
        self.store
            .upsert_completed(message_id, result)
            .await
            .inspect(|_| debug!(message_id = %message_id, "task completed"))
            .inspect_err(|e| {
                error!(message_id = %message_id, error = %e, "failed to mark task completed")
            })
    }

    pub async fn mark_failed(&self, message_id: &MessageId, error_text: &str) -> Result<(), StoreError> {
        self.store
            .upsert_failed(message_id, error_text)
            .await
            .inspect(|_| debug!(message_id = %message_id, error_text, "task failed"))
            .inspect_err(|e| {
                error!(message_id = %message_id, error = %e, "failed to mark task failed")
            })
    }

    /// Record the dispatch outcome as exactly one terminal write.
    pub async fn finish(
        &self,
        message_id: &MessageId,
        outcome: Result<Value, DispatchError>,
    ) -> Result<TaskStatus, StoreError> {
        match outcome {
            Ok(result) => {
                self.mark_completed(message_id, result).await?;
                Ok(TaskStatus::Completed)
            }
            Err(e) => {
                self.mark_failed(message_id, &e.failure_text()).await?;
                Ok(TaskStatus::Failed)
            }
        }
    }
}
