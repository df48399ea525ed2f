//! Typed - handler capabilities and the registry that maps task types to them.
//!
//! # Two layers
//! - **Typed**: `Task` trait, `Handler<T>` trait - payload decoding checked by serde
//! - **Dyn**: `TaskHandler` trait - object-safe, what the dispatcher calls

pub mod handler;
pub mod registry;
pub mod task;

pub use self::handler::{Handler, TaskHandler, TypedHandler};
pub use self::registry::{HandlerRegistry, RegistryError};
pub use self::task::Task;
