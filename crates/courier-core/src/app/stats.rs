//! PollerStats - per-poller counters, summed across the worker group.

use serde::Serialize;

use super::poller::ProcessOutcome;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PollerStats {
    pub receive_calls: u64,
    pub received: u64,
    pub completed: u64,
    pub failed: u64,
    /// Redeliveries of messages whose row was already terminal.
    pub duplicates: u64,
    pub malformed: u64,
    pub store_errors: u64,
    pub ack_errors: u64,
    pub transport_errors: u64,
    /// Messages handed back unprocessed because shutdown was requested mid-batch.
    pub released: u64,
}

impl PollerStats {
    pub fn record(&mut self, outcome: &ProcessOutcome) {
        match outcome {
            ProcessOutcome::Completed { acknowledged } => {
                self.completed += 1;
                self.count_ack(*acknowledged);
            }
            ProcessOutcome::Failed { acknowledged } => {
                self.failed += 1;
                self.count_ack(*acknowledged);
            }
            ProcessOutcome::Duplicate { acknowledged, .. } => {
                self.duplicates += 1;
                self.count_ack(*acknowledged);
            }
            ProcessOutcome::Malformed => self.malformed += 1,
            ProcessOutcome::StoreFailed => self.store_errors += 1,
        }
    }

    fn count_ack(&mut self, acknowledged: bool) {
        if !acknowledged {
            self.ack_errors += 1;
        }
    }

    pub fn merge(&mut self, other: &PollerStats) {
        self.receive_calls += other.receive_calls;
        self.received += other.received;
        self.completed += other.completed;
        self.failed += other.failed;
        self.duplicates += other.duplicates;
        self.malformed += other.malformed;
        self.store_errors += other.store_errors;
        self.ack_errors += other.ack_errors;
        self.transport_errors += other.transport_errors;
        self.released += other.released;
    }

    /// Messages that went all the way to a terminal row.
    pub fn processed(&self) -> u64 {
        self.completed + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskStatus;

    #[test]
    fn record_counts_outcomes_and_ack_failures() {
        let mut stats = PollerStats::default();
        stats.record(&ProcessOutcome::Completed { acknowledged: true });
        stats.record(&ProcessOutcome::Failed { acknowledged: false });
        stats.record(&ProcessOutcome::Duplicate {
            status: TaskStatus::Completed,
            acknowledged: true,
        });
        stats.record(&ProcessOutcome::Malformed);
        stats.record(&ProcessOutcome::StoreFailed);

        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.store_errors, 1);
        assert_eq!(stats.ack_errors, 1);
        assert_eq!(stats.processed(), 2);
    }

    #[test]
    fn merge_adds_every_counter() {
        let mut a = PollerStats {
            receive_calls: 3,
            received: 2,
            completed: 2,
            ..Default::default()
        };
        let b = PollerStats {
            receive_calls: 1,
            transport_errors: 1,
            released: 4,
            ..Default::default()
        };
        a.merge(&b);
        assert_eq!(a.receive_calls, 4);
        assert_eq!(a.received, 2);
        assert_eq!(a.transport_errors, 1);
        assert_eq!(a.released, 4);
    }
}
