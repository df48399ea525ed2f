//! Handler traits.
//!
//! Two layers:
//! - `TaskHandler` is object-safe and works on raw JSON; this is what the
//!   registry stores and the dispatcher calls.
//! - `Handler<T>` is the typed surface; `TypedHandler<T, H>` erases it into a
//!   `TaskHandler` by decoding the payload and encoding the output.
//!
//! Handlers may do I/O and may suspend for as long as they need. Delivery is
//! at-least-once, so a handler must tolerate being invoked twice with the same
//! payload.

use std::marker::PhantomData;

use async_trait::async_trait;
use serde::Serialize;

use super::task::Task;
use crate::domain::HandlerError;

/// Object-safe handler capability: `payload -> Result<output, error>`.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn invoke(&self, payload: serde_json::Value) -> Result<serde_json::Value, HandlerError>;
}

/// Typed handler for one `Task` type.
///
/// # Example
/// ```ignore
/// struct SendEmailHandler;
///
/// #[async_trait]
/// impl Handler<SendEmail> for SendEmailHandler {
///     type Output = serde_json::Value;
///
///     async fn handle(&self, task: SendEmail) -> Result<Self::Output, HandlerError> {
///         Ok(json!({ "status": "sent", "recipient": task.recipient }))
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<T: Task>: Send + Sync {
    type Output: Serialize + Send;

    async fn handle(&self, task: T) -> Result<Self::Output, HandlerError>;
}

/// Adapter from `Handler<T>` to `TaskHandler`.
pub struct TypedHandler<T: Task, H: Handler<T>> {
    handler: H,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Task, H: Handler<T>> TypedHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Task, H: Handler<T>> TaskHandler for TypedHandler<T, H> {
    async fn invoke(&self, payload: serde_json::Value) -> Result<serde_json::Value, HandlerError> {
        let task: T = serde_json::from_value(payload).map_err(HandlerError::invalid_payload)?;
        let output = self.handler.handle(task).await?;
        serde_json::to_value(output)
            .map_err(|e| HandlerError::new(format!("unserializable handler output: {e}")))
    }
}
