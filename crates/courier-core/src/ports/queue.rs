//! Queue port - the message transport (SQS-like, or in-memory).
//!
//! Delivery is at-least-once: a message that is received but never
//! acknowledged becomes visible again once the transport's visibility timeout
//! expires. That redelivery is the only retry mechanism the engine relies on.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{Message, QueueError};

/// Queue is the receive/acknowledge boundary of the worker.
///
/// # Contract
/// - `receive` may block for up to `wait` (long polling) and returns at most
///   `max_messages` messages; an empty batch is not an error.
/// - `receive` must be cancel-safe: dropping the future before it resolves must
///   not lose a message.
/// - `acknowledge` deletes the delivery identified by the message's receipt and
///   fails loudly when the receipt is stale.
#[async_trait]
pub trait Queue: Send + Sync {
    async fn receive(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<Message>, QueueError>;

    async fn acknowledge(&self, message: &Message) -> Result<(), QueueError>;

    /// Give a delivery back without deleting it, so it can be redelivered
    /// before its visibility timeout runs out. Transports without such an
    /// operation simply let the timeout expire.
    async fn release(&self, message: &Message) -> Result<(), QueueError> {
        let _ = message;
        Ok(())
    }

    /// Release transport resources. Called once, after the last poller stopped.
    async fn close(&self) -> Result<(), QueueError> {
        Ok(())
    }
}
