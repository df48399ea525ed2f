//! Dispatcher - message body to handler output.
//!
//! Classification:
//! - body does not decode          -> `DispatchError::Malformed`
//! - no handler for `type`         -> `DispatchError::UnknownType`
//! - handler returns an error      -> `DispatchError::HandlerFailed` (text verbatim)
//! - handler panics                -> `DispatchError::HandlerFailed`
//! - handler exceeds the timeout   -> `DispatchError::TimedOut`
//! - handler returns a value       -> `Ok(output)`

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::domain::{DispatchError, HandlerError, TaskEnvelope};
use crate::typed::HandlerRegistry;

pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    handler_timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self {
            registry,
            handler_timeout: None,
        }
    }

    pub fn with_handler_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handler_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn decode(&self, body: &str) -> Result<TaskEnvelope, DispatchError> {
        TaskEnvelope::decode(body).map_err(|e| DispatchError::Malformed(e.to_string()))
    }

    /// Resolve the handler for `task` and run it to completion.
    ///
    /// The handler runs on its own tokio task so a panic is contained and
    /// reported as a handler failure instead of taking the poller down.
    pub async fn dispatch(&self, task: &TaskEnvelope) -> Result<serde_json::Value, DispatchError> {
        let handler = self
            .registry
            .get(task.task_type())
            .ok_or_else(|| DispatchError::UnknownType(task.task_type().clone()))?;

        debug!(task_type = %task.task_type(), "invoking handler");
        let payload = task.payload().clone();
        let mut invocation = tokio::spawn(async move { handler.invoke(payload).await });

        let joined = match self.handler_timeout {
            None => invocation.await,
            Some(limit) => match tokio::time::timeout(limit, &mut invocation).await {
                Ok(joined) => joined,
                Err(_) => {
                    invocation.abort();
                    return Err(DispatchError::TimedOut(limit));
                }
            },
        };

        match joined {
            Ok(result) => result.map_err(DispatchError::from),
            Err(join_err) if join_err.is_panic() => Err(DispatchError::HandlerFailed(
                HandlerError::new(format!("handler panicked: {}", panic_text(join_err.into_panic()))),
            )),
            Err(join_err) => Err(DispatchError::HandlerFailed(HandlerError::new(format!(
                "handler task aborted: {join_err}"
            )))),
        }
    }
}

fn panic_text(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
