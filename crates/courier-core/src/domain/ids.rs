//! Domain identifiers (strongly-typed IDs).
//!
//! Every identifier the engine handles is minted by someone else: the producer
//! picks the `task_id`, the queue transport assigns the `message_id` and the
//! receipt token, the process names itself with a `worker_id`. The engine never
//! interprets them, so they are opaque strings underneath.
//!
//! ## Phantom Type pattern
//! `Id<T>` provides one shared implementation while the zero-sized marker `T`
//! keeps a `MessageId` from being passed where a `TaskId` is expected. Mixing
//! them up is the classic bug in a system where one id is the persistence key
//! and the other is only used for logs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Marker trait implemented by each identifier kind.
pub trait IdMarker: Send + Sync + 'static {
    /// Human-readable kind, used in debug output.
    fn kind() -> &'static str;
}

/// Generic string-backed identifier.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    value: String,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_inner(self) -> String {
        self.value
    }
}

impl<T: IdMarker> From<String> for Id<T> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> From<&str> for Id<T> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> AsRef<str> for Id<T> {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T: IdMarker> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", T::kind(), self.value)
    }
}

// ========================================
// Marker types
// ========================================

/// Producer-supplied task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {}

impl IdMarker for Task {
    fn kind() -> &'static str {
        "TaskId"
    }
}

/// Transport-assigned message identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Message {}

impl IdMarker for Message {
    fn kind() -> &'static str {
        "MessageId"
    }
}

/// Credential that entitles the holder to acknowledge one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Receipt {}

impl IdMarker for Receipt {
    fn kind() -> &'static str {
        "ReceiptToken"
    }
}

/// Identity of a worker process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Worker {}

impl IdMarker for Worker {
    fn kind() -> &'static str {
        "WorkerId"
    }
}

// ========================================
// Type aliases
// ========================================

/// Correlation id chosen by the producer. Logging only, never a storage key.
pub type TaskId = Id<Task>;

/// Id assigned by the queue transport; the persistence key of a task row.
pub type MessageId = Id<Message>;

/// Opaque token required to acknowledge a specific delivery.
pub type ReceiptToken = Id<Receipt>;

/// Stable for the lifetime of a worker process.
pub type WorkerId = Id<Worker>;
