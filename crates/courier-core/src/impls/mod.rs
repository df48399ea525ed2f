//! Impls - in-process adapters for the ports.
//!
//! # Included
//! - **InMemoryQueue**: SQS-like queue with receipts and visibility timeouts
//! - **InMemoryTaskStore**: lifecycle rows with conditional writes
//!
//! Production adapters (SQS, PostgreSQL) implement the same traits in their
//! own crates.

pub mod inmem_queue;
pub mod inmem_store;

pub use self::inmem_queue::{DeadLetter, InMemoryQueue};
pub use self::inmem_store::{InMemoryTaskStore, StatusCounts, Transition};
