//! IdGenerator port - mints the worker identity.
//!
//! The engine only ever creates one id itself: the `worker_id` recorded on
//! every row a process claims. It has to be unique across processes sharing a
//! queue, so it combines the pid with a ULID.

use ulid::Ulid;

use crate::domain::WorkerId;
use crate::ports::Clock;

/// IdGenerator produces worker identities.
pub trait IdGenerator: Send + Sync {
    fn generate_worker_id(&self) -> WorkerId;
}

/// ULID based generator.
///
/// Takes the timestamp part from the `Clock`, so a `FixedClock` yields ids
/// with a predictable prefix.
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_worker_id(&self) -> WorkerId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        WorkerId::new(format!("worker-{}-{}", std::process::id(), ulid))
    }
}
