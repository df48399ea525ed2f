//! TaskStore port - durable lifecycle rows (PostgreSQL, or in-memory).
//!
//! Rows are keyed by `message_id` and created implicitly by the first
//! `upsert_processing`. There is no enqueue path here: producers own that.

use async_trait::async_trait;

use crate::domain::{MessageId, StoreError, TaskStatus, WorkerId};

/// TaskStore persists task state transitions.
///
/// # Contract
/// - Each `upsert_*` is one atomic, conditional write on a single row.
/// - A terminal row (`completed` / `failed`) is never modified again; such a
///   write is rejected with `StoreError::Conflict`.
/// - `upsert_completed` / `upsert_failed` require the row to be `processing`.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn upsert_processing(
        &self,
        message_id: &MessageId,
        worker_id: &WorkerId,
    ) -> Result<(), StoreError>;

    async fn upsert_completed(
        &self,
        message_id: &MessageId,
        result: serde_json::Value,
    ) -> Result<(), StoreError>;

    async fn upsert_failed(
        &self,
        message_id: &MessageId,
        error_text: &str,
    ) -> Result<(), StoreError>;

    /// Current status of the row, `None` if no row exists yet.
    async fn status(&self, message_id: &MessageId) -> Result<Option<TaskStatus>, StoreError>;

    /// Release store resources (connection pool, ...).
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
