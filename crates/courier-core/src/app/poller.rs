//! Poller - the receive / process / acknowledge loop.
//!
//! Per message:
//! 1. decode the body (malformed -> log, leave for redelivery)
//! 2. claim the row (`processing`), or skip a redelivered terminal row
//! 3. dispatch to the handler
//! 4. exactly one terminal write (`completed` / `failed`)
//! 5. acknowledge
//!
//! A store failure at 2 or 4 stops the pipeline for that message without an
//! acknowledgment, so the transport redelivers it after the visibility timeout.

use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, debug, info, info_span, warn};

use super::dispatcher::Dispatcher;
use super::lifecycle::{Claim, LifecycleTracker};
use super::shutdown::ShutdownSignal;
use super::stats::PollerStats;
use crate::config::{MAX_WAIT_SECONDS, WorkerConfig};
use crate::domain::{Message, TaskEnvelope, TaskStatus};
use crate::ports::Queue;

/// What happened to one received message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Completed { acknowledged: bool },
    Failed { acknowledged: bool },
    /// Redelivery of a message whose row was already terminal.
    Duplicate { status: TaskStatus, acknowledged: bool },
    Malformed,
    StoreFailed,
}

/// Receive parameters of one poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub max_messages: usize,
    pub wait_time: Duration,
    pub error_backoff: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_messages: 1,
            wait_time: Duration::from_secs(MAX_WAIT_SECONDS),
            error_backoff: Duration::from_secs(5),
        }
    }
}

impl From<&WorkerConfig> for PollSettings {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            max_messages: config.max_messages,
            wait_time: config.wait_time,
            error_backoff: config.error_backoff,
        }
    }
}

pub struct Poller {
    index: usize,
    queue: Arc<dyn Queue>,
    tracker: Arc<LifecycleTracker>,
    dispatcher: Arc<Dispatcher>,
    settings: PollSettings,
}

impl Poller {
    pub fn new(
        index: usize,
        queue: Arc<dyn Queue>,
        tracker: Arc<LifecycleTracker>,
        dispatcher: Arc<Dispatcher>,
        settings: PollSettings,
    ) -> Self {
        Self {
            index,
            queue,
            tracker,
            dispatcher,
            settings,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Run until `shutdown` is requested.
    ///
    /// The check happens before every `receive()`, and a pending long poll is
    /// abandoned as soon as shutdown is requested. A message already taken out
    /// of the batch always runs through its whole pipeline; the rest of the
    /// batch is released.
    pub async fn run(&self, mut shutdown: ShutdownSignal) -> PollerStats {
        let mut stats = PollerStats::default();
        info!(
            poller = self.index,
            worker_id = %self.tracker.worker_id(),
            "poller started"
        );

        while !shutdown.is_requested() {
            stats.receive_calls += 1;
            let received = tokio::select! {
                biased;
                _ = shutdown.requested() => break,
                r = self.queue.receive(self.settings.max_messages, self.settings.wait_time) => r,
            };

            let batch = match received {
                Ok(batch) => batch,
                Err(e) => {
                    stats.transport_errors += 1;
                    warn!(
                        poller = self.index,
                        error = %e,
                        backoff_secs = self.settings.error_backoff.as_secs(),
                        "receive failed, backing off"
                    );
                    tokio::select! {
                        biased;
                        _ = shutdown.requested() => break,
                        _ = tokio::time::sleep(self.settings.error_backoff) => {}
                    }
                    continue;
                }
            };

            stats.received += batch.len() as u64;
            let mut batch = batch.into_iter();
            for message in batch.by_ref() {
                let outcome = self.process(&message).await;
                stats.record(&outcome);
                if shutdown.is_requested() {
                    break;
                }
            }
            for message in batch {
                stats.released += 1;
                if let Err(e) = self.queue.release(&message).await {
                    warn!(message_id = %message.id, error = %e, "failed to release message");
                }
            }
        }

        info!(poller = self.index, ?stats, "poller stopped");
        stats
    }

    /// Run one message through decode, claim, dispatch, terminal write, ack.
    pub async fn process(&self, message: &Message) -> ProcessOutcome {
        let task = match self.dispatcher.decode(&message.body) {
            Ok(task) => task,
            Err(e) => {
                warn!(
                    message_id = %message.id,
                    error = %e,
                    "malformed message left for redelivery"
                );
                return ProcessOutcome::Malformed;
            }
        };

        let span = info_span!(
            "task",
            message_id = %message.id,
            task_id = %task.task_id(),
            task_type = %task.task_type(),
        );
        self.run_task(message, task).instrument(span).await
    }

    async fn run_task(&self, message: &Message, task: TaskEnvelope) -> ProcessOutcome {
        if message.is_redelivery() {
            debug!(receive_count = message.receive_count, "redelivered message");
        }

        match self.tracker.begin(&message.id).await {
            Ok(Claim::Claimed) => {}
            Ok(Claim::AlreadyTerminal(status)) => {
                info!(%status, "task already finished, acknowledging duplicate delivery");
                let acknowledged = self.acknowledge(message).await;
                return ProcessOutcome::Duplicate {
                    status,
                    acknowledged,
                };
            }
            Err(_) => return ProcessOutcome::StoreFailed,
        }

        let outcome = self.dispatcher.dispatch(&task).await;
        if let Err(e) = &outcome {
            warn!(error = %e, "task failed");
        }

        let status = match self.tracker.finish(&message.id, outcome).await {
            Ok(status) => status,
            Err(_) => return ProcessOutcome::StoreFailed,
        };
        let acknowledged = self.acknowledge(message).await;
        info!(%status, "task finished");

        match status {
            TaskStatus::Completed => ProcessOutcome::Completed { acknowledged },
            _ => ProcessOutcome::Failed { acknowledged },
        }
    }

    /// An ack failure is logged only: the row is already terminal and the
    /// redelivery will be skipped as a duplicate.
    async fn acknowledge(&self, message: &Message) -> bool {
        match self.queue.acknowledge(message).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to acknowledge message");
                false
            }
        }
    }
}
