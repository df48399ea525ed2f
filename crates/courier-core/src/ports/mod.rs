//! Ports - the abstraction layer.
//!
//! Each trait is the worker's interface to an external system (the queue
//! transport, the relational store, the wall clock). The engine depends on
//! these traits only; concrete adapters live in `impls` or in other crates.

pub mod clock;
pub mod id_generator;
pub mod queue;
pub mod task_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::queue::Queue;
pub use self::task_store::TaskStore;
