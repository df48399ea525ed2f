//! InMemoryTaskStore - a TaskStore for development and tests.
//!
//! Each write runs under one lock, which makes it the in-memory analogue of a
//! single conditional `UPDATE ... WHERE message_id = $1 AND status = ...`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::domain::{InvalidTransition, MessageId, StoreError, TaskRecord, TaskStatus, WorkerId};
use crate::ports::{Clock, SystemClock, TaskStore};

/// One accepted status change.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub message_id: MessageId,
    pub from: TaskStatus,
    pub to: TaskStatus,
    pub at: DateTime<Utc>,
}

/// Row counts per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.processing + self.completed + self.failed
    }
}

#[derive(Default)]
struct StoreState {
    rows: HashMap<MessageId, TaskRecord>,
    history: Vec<Transition>,
    closed: bool,
}

impl StoreState {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    /// Apply `change` to an existing row and record the transition.
    fn apply<F>(&mut self, message_id: &MessageId, at: DateTime<Utc>, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut TaskRecord) -> Result<(), InvalidTransition>,
    {
        self.ensure_open()?;
        let row = self
            .rows
            .get_mut(message_id)
            .ok_or_else(|| StoreError::NotFound(message_id.clone()))?;
        let from = row.status;
        change(row).map_err(|t| conflict(message_id, t))?;
        let to = row.status;
        self.history.push(Transition {
            message_id: message_id.clone(),
            from,
            to,
            at,
        });
        Ok(())
    }
}

fn conflict(message_id: &MessageId, t: InvalidTransition) -> StoreError {
    StoreError::Conflict {
        message_id: message_id.clone(),
        from: t.from,
        to: t.to,
    }
}

/// In-memory task store.
pub struct InMemoryTaskStore {
    state: Mutex<StoreState>,
    clock: Arc<dyn Clock>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            clock,
        }
    }

    pub async fn get(&self, message_id: &MessageId) -> Option<TaskRecord> {
        self.state.lock().await.rows.get(message_id).cloned()
    }

    /// All rows, ordered by message id.
    pub async fn records(&self) -> Vec<TaskRecord> {
        let state = self.state.lock().await;
        let mut rows: Vec<TaskRecord> = state.rows.values().cloned().collect();
        rows.sort_by(|a, b| a.message_id.cmp(&b.message_id));
        rows
    }

    /// Every accepted transition, oldest first.
    pub async fn history(&self) -> Vec<Transition> {
        self.state.lock().await.history.clone()
    }

    pub async fn counts(&self) -> StatusCounts {
        let state = self.state.lock().await;
        let mut counts = StatusCounts::default();
        for row in state.rows.values() {
            match row.status {
                TaskStatus::Pending => counts.pending += 1,
                TaskStatus::Processing => counts.processing += 1,
                TaskStatus::Completed => counts.completed += 1,
                TaskStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn upsert_processing(
        &self,
        message_id: &MessageId,
        worker_id: &WorkerId,
    ) -> Result<(), StoreError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        state.ensure_open()?;
        state
            .rows
            .entry(message_id.clone())
            .or_insert_with(|| TaskRecord::new(message_id.clone()));
        state.apply(message_id, now, |row| row.start_attempt(worker_id.clone(), now))
    }

    async fn upsert_completed(
        &self,
        message_id: &MessageId,
        result: serde_json::Value,
    ) -> Result<(), StoreError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        state.apply(message_id, now, |row| row.mark_completed(result, now))
    }

    async fn upsert_failed(
        &self,
        message_id: &MessageId,
        error_text: &str,
    ) -> Result<(), StoreError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        state.apply(message_id, now, |row| row.mark_failed(error_text, now))
    }

    async fn status(&self, message_id: &MessageId) -> Result<Option<TaskStatus>, StoreError> {
        let state = self.state.lock().await;
        state.ensure_open()?;
        Ok(state.rows.get(message_id).map(|row| row.status))
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.state.lock().await.closed = true;
        Ok(())
    }
}
