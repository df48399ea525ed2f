//! InMemoryQueue - an SQS-like queue for development and tests.
//!
//! # Semantics
//! - `receive` hides a message for `visibility_timeout` and hands out a fresh
//!   receipt token; unacknowledged messages become visible again afterwards.
//! - `acknowledge` deletes the message, but only with the receipt of its
//!   current delivery.
//! - With `max_receives` set, a message that would be delivered more often
//!   than that is moved to the dead-letter list instead (redrive policy).
//! - Long polling waits on a `Notify` that `send`, `release` and `close` fire.
//! - Only the most recent `ACK_HISTORY` acknowledged ids are kept; the total
//!   is counted separately.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use crate::domain::{Message, MessageId, QueueError, ReceiptToken};
use crate::ports::Queue;

/// Acknowledged ids retained for inspection.
pub const ACK_HISTORY: usize = 1024;

/// A message that exhausted its receive budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    pub id: MessageId,
    pub body: String,
    pub receive_count: u32,
}

#[derive(Debug, Clone)]
struct Stored {
    id: MessageId,
    body: String,
    receive_count: u32,
}

#[derive(Debug)]
struct InFlight {
    stored: Stored,
    receipt: ReceiptToken,
    visible_at: Instant,
}

#[derive(Debug, Default)]
struct QueueState {
    visible: VecDeque<Stored>,
    in_flight: HashMap<MessageId, InFlight>,
    dead_letters: Vec<DeadLetter>,
    acknowledged: VecDeque<MessageId>,
    acknowledged_total: u64,
    next_message: u64,
    next_receipt: u64,
    closed: bool,
}

impl QueueState {
    /// Move expired in-flight messages back to the visible queue.
    fn requeue_expired(&mut self, now: Instant) {
        let mut expired: Vec<(Instant, MessageId)> = self
            .in_flight
            .iter()
            .filter(|(_, f)| f.visible_at <= now)
            .map(|(id, f)| (f.visible_at, id.clone()))
            .collect();
        expired.sort();

        for (_, id) in expired {
            if let Some(flight) = self.in_flight.remove(&id) {
                self.visible.push_back(flight.stored);
            }
        }
    }

    fn next_expiry(&self) -> Option<Instant> {
        self.in_flight.values().map(|f| f.visible_at).min()
    }

    fn take(
        &mut self,
        max: usize,
        now: Instant,
        visibility: Duration,
        max_receives: Option<u32>,
    ) -> Vec<Message> {
        let mut batch = Vec::new();
        while batch.len() < max {
            let Some(mut stored) = self.visible.pop_front() else {
                break;
            };
            stored.receive_count += 1;

            if let Some(limit) = max_receives {
                if stored.receive_count > limit {
                    self.dead_letters.push(DeadLetter {
                        id: stored.id,
                        body: stored.body,
                        receive_count: stored.receive_count - 1,
                    });
                    continue;
                }
            }

            self.next_receipt += 1;
            let receipt = ReceiptToken::new(format!("rcpt-{}-{}", stored.id, self.next_receipt));
            batch.push(Message {
                id: stored.id.clone(),
                receipt: receipt.clone(),
                body: stored.body.clone(),
                receive_count: stored.receive_count,
            });
            self.in_flight.insert(
                stored.id.clone(),
                InFlight {
                    stored,
                    receipt,
                    visible_at: now + visibility,
                },
            );
        }
        batch
    }

    /// Remove the in-flight entry for `message` if its receipt is current.
    fn take_in_flight(&mut self, message: &Message) -> Result<InFlight, QueueError> {
        match self.in_flight.get(&message.id) {
            Some(flight) if flight.receipt == message.receipt => {}
            _ => return Err(QueueError::StaleReceipt(message.id.clone())),
        }
        self.in_flight
            .remove(&message.id)
            .ok_or_else(|| QueueError::StaleReceipt(message.id.clone()))
    }
}

/// In-memory queue implementation.
pub struct InMemoryQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    visibility_timeout: Duration,
    max_receives: Option<u32>,
}

impl InMemoryQueue {
    pub fn new(visibility_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            visibility_timeout,
            max_receives: None,
        }
    }

    /// Dead-letter messages once they have been received `max_receives` times.
    pub fn with_max_receives(mut self, max_receives: u32) -> Self {
        self.max_receives = Some(max_receives.max(1));
        self
    }

    /// Producer side: enqueue a body and return the transport-assigned id.
    pub async fn send(&self, body: impl Into<String>) -> Result<MessageId, QueueError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(QueueError::Closed);
        }
        state.next_message += 1;
        let id = MessageId::new(format!("msg-{:06}", state.next_message));
        state.visible.push_back(Stored {
            id: id.clone(),
            body: body.into(),
            receive_count: 0,
        });
        drop(state);

        self.notify.notify_waiters();
        Ok(id)
    }

    /// Messages waiting to be received.
    pub async fn visible_len(&self) -> usize {
        self.state.lock().await.visible.len()
    }

    /// Messages received but neither acknowledged nor expired yet.
    pub async fn in_flight_len(&self) -> usize {
        self.state.lock().await.in_flight.len()
    }

    /// Most recently acknowledged (deleted) ids, oldest first.
    pub async fn acknowledged(&self) -> Vec<MessageId> {
        self.state.lock().await.acknowledged.iter().cloned().collect()
    }

    /// Acknowledgments since the queue was created.
    pub async fn acknowledged_total(&self) -> u64 {
        self.state.lock().await.acknowledged_total
    }

    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        self.state.lock().await.dead_letters.clone()
    }

    /// True when nothing is visible or in flight.
    pub async fn is_drained(&self) -> bool {
        let state = self.state.lock().await;
        state.visible.is_empty() && state.in_flight.is_empty()
    }
}

#[async_trait]
impl Queue for InMemoryQueue {
    async fn receive(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<Message>, QueueError> {
        let deadline = Instant::now() + wait;

        loop {
            // Register interest before looking at the state so a `send`
            // between the check and the wait is not missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let wake_at = {
                let mut state = self.state.lock().await;
                if state.closed {
                    return Err(QueueError::Closed);
                }
                let now = Instant::now();
                state.requeue_expired(now);

                let batch = state.take(
                    max_messages.max(1),
                    now,
                    self.visibility_timeout,
                    self.max_receives,
                );
                if !batch.is_empty() {
                    return Ok(batch);
                }
                if now >= deadline {
                    return Ok(Vec::new());
                }
                state
                    .next_expiry()
                    .map_or(deadline, |expiry| expiry.min(deadline))
            };

            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep_until(wake_at) => {}
            }
        }
    }

    async fn acknowledge(&self, message: &Message) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        let flight = state.take_in_flight(message)?;
        if state.acknowledged.len() == ACK_HISTORY {
            state.acknowledged.pop_front();
        }
        state.acknowledged.push_back(flight.stored.id);
        state.acknowledged_total += 1;
        Ok(())
    }

    async fn release(&self, message: &Message) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        let flight = state.take_in_flight(message)?;
        state.visible.push_front(flight.stored);
        drop(state);

        self.notify.notify_waiters();
        Ok(())
    }

    async fn close(&self) -> Result<(), QueueError> {
        self.state.lock().await.closed = true;
        self.notify.notify_waiters();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const VISIBILITY: Duration = Duration::from_secs(30);

    #[tokio::test]
    async fn send_receive_acknowledge() {
        let queue = InMemoryQueue::new(VISIBILITY);
        let id = queue.send("hello").await.unwrap();

        let batch = queue.receive(1, Duration::ZERO).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id, id);
        assert_eq!(batch[0].body, "hello");
        assert_eq!(batch[0].receive_count, 1);
        assert_eq!(queue.in_flight_len().await, 1);

        queue.acknowledge(&batch[0]).await.unwrap();
        assert!(queue.is_drained().await);
        assert_eq!(queue.acknowledged().await, vec![id]);
    }

    #[tokio::test]
    async fn acknowledgment_history_is_bounded() {
        let queue = InMemoryQueue::new(VISIBILITY);
        let extra = 5;
        let mut last = None;
        for i in 0..ACK_HISTORY + extra {
            queue.send(format!("m{i}")).await.unwrap();
            let msg = queue.receive(1, Duration::ZERO).await.unwrap().remove(0);
            queue.acknowledge(&msg).await.unwrap();
            last = Some(msg.id);
        }

        let acked = queue.acknowledged().await;
        assert_eq!(acked.len(), ACK_HISTORY);
        assert_eq!(acked[0], MessageId::new(format!("msg-{:06}", extra + 1)));
        assert_eq!(acked.last(), last.as_ref());
        assert_eq!(queue.acknowledged_total().await, (ACK_HISTORY + extra) as u64);
    }

    #[tokio::test]
    async fn receive_respects_batch_size() {
        let queue = InMemoryQueue::new(VISIBILITY);
        for i in 0..3 {
            queue.send(format!("m{i}")).await.unwrap();
        }
        let batch = queue.receive(2, Duration::ZERO).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(queue.visible_len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_long_poll_waits_the_full_duration() {
        let queue = InMemoryQueue::new(VISIBILITY);
        let start = Instant::now();
        let batch = queue.receive(1, Duration::from_secs(20)).await.unwrap();
        assert!(batch.is_empty());
        assert!(start.elapsed() >= Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn send_wakes_a_waiting_receive() {
        let queue = Arc::new(InMemoryQueue::new(VISIBILITY));
        let waiter = tokio::spawn({
            let queue = queue.clone();
            async move { queue.receive(1, Duration::from_secs(20)).await.unwrap() }
        });

        tokio::time::sleep(Duration::from_secs(3)).await;
        let start = Instant::now();
        let id = queue.send("late").await.unwrap();

        let batch = waiter.await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id, id);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn unacknowledged_message_is_redelivered_with_new_receipt() {
        let queue = InMemoryQueue::new(VISIBILITY);
        queue.send("work").await.unwrap();

        let first = queue.receive(1, Duration::ZERO).await.unwrap().remove(0);
        assert!(queue.receive(1, Duration::ZERO).await.unwrap().is_empty());

        tokio::time::advance(VISIBILITY + Duration::from_secs(1)).await;
        let second = queue.receive(1, Duration::ZERO).await.unwrap().remove(0);
        assert_eq!(second.id, first.id);
        assert_ne!(second.receipt, first.receipt);
        assert_eq!(second.receive_count, 2);
        assert!(second.is_redelivery());

        let err = queue.acknowledge(&first).await.unwrap_err();
        assert!(matches!(err, QueueError::StaleReceipt(id) if id == first.id));
        queue.acknowledge(&second).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn long_poll_picks_up_expiring_message() {
        let queue = InMemoryQueue::new(Duration::from_secs(5));
        queue.send("work").await.unwrap();
        let _first = queue.receive(1, Duration::ZERO).await.unwrap();

        let start = Instant::now();
        let again = queue.receive(1, Duration::from_secs(20)).await.unwrap();
        assert_eq!(again.len(), 1);
        assert!(start.elapsed() >= Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(20));
    }

    #[tokio::test]
    async fn release_makes_message_visible_immediately() {
        let queue = InMemoryQueue::new(VISIBILITY);
        queue.send("a").await.unwrap();
        let msg = queue.receive(1, Duration::ZERO).await.unwrap().remove(0);

        queue.release(&msg).await.unwrap();
        let again = queue.receive(1, Duration::ZERO).await.unwrap();
        assert_eq!(again[0].id, msg.id);
        assert_eq!(again[0].receive_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_messages_are_dead_lettered() {
        let queue = InMemoryQueue::new(Duration::from_secs(1)).with_max_receives(2);
        let id = queue.send("poison").await.unwrap();

        for _ in 0..2 {
            let batch = queue.receive(1, Duration::ZERO).await.unwrap();
            assert_eq!(batch.len(), 1);
            tokio::time::advance(Duration::from_secs(2)).await;
        }

        assert!(queue.receive(1, Duration::ZERO).await.unwrap().is_empty());
        let dead = queue.dead_letters().await;
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].id, id);
        assert_eq!(dead[0].receive_count, 2);
        assert!(queue.is_drained().await);
    }

    #[tokio::test]
    async fn closed_queue_rejects_receive_and_send() {
        let queue = InMemoryQueue::new(VISIBILITY);
        queue.close().await.unwrap();
        assert!(matches!(
            queue.receive(1, Duration::ZERO).await,
            Err(QueueError::Closed)
        ));
        assert!(matches!(queue.send("x").await, Err(QueueError::Closed)));
    }
}
