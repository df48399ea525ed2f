//! Worker configuration.
//!
//! Plain values; the binary fills them from `COURIER_*` environment variables
//! and flags. The bounds below are the ones the binary enforces when parsing.

use std::time::Duration;

use crate::domain::WorkerId;

/// Upper bound of a single long poll (SQS caps `WaitTimeSeconds` at 20).
pub const MAX_WAIT_SECONDS: u64 = 20;

/// Upper bound of a receive batch (SQS caps `MaxNumberOfMessages` at 10).
pub const MAX_BATCH: usize = 10;

/// Poller settings.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    /// Fixed worker identity; generated at startup when `None`.
    pub worker_id: Option<WorkerId>,

    /// Messages requested per `receive()` call.
    pub max_messages: usize,

    /// Long-poll wait per `receive()` call.
    pub wait_time: Duration,

    /// Delay after a failed `receive()` before trying again.
    pub error_backoff: Duration,

    /// Number of pollers sharing the queue, store and registry.
    pub concurrency: usize,

    /// Upper bound on a single handler invocation. `None` waits forever.
    pub handler_timeout: Option<Duration>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: None,
            max_messages: 1,
            wait_time: Duration::from_secs(MAX_WAIT_SECONDS),
            error_backoff: Duration::from_secs(5),
            concurrency: 1,
            handler_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_long_poll_worker() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_messages, 1);
        assert_eq!(config.wait_time, Duration::from_secs(20));
        assert_eq!(config.error_backoff, Duration::from_secs(5));
        assert_eq!(config.concurrency, 1);
        assert!(config.handler_timeout.is_none());
        assert!(config.worker_id.is_none());
    }
}
