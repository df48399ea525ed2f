//! Test doubles shared by the app-layer tests.
//!
//! `Journal` records every queue and store interaction in order, so tests can
//! assert on cross-component ordering (claim before dispatch, terminal write
//! before ack, no receive after shutdown).

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::domain::{
    HandlerError, Message, MessageId, QueueError, ReceiptToken, StoreError, TaskStatus, WorkerId,
};
use crate::impls::InMemoryTaskStore;
use crate::ports::{Queue, TaskStore};
use crate::typed::{HandlerRegistry, TaskHandler};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Receive,
    StatusChecked(String),
    Processing(String),
    Completed(String),
    Failed(String),
    Acked(String),
    Released(String),
    Invoked(String),
}

impl Event {
    fn message_id(&self) -> Option<&str> {
        match self {
            Event::StatusChecked(id)
            | Event::Processing(id)
            | Event::Completed(id)
            | Event::Failed(id)
            | Event::Acked(id)
            | Event::Released(id) => Some(id.as_str()),
            Event::Receive | Event::Invoked(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct Journal {
    events: Arc<watch::Sender<Vec<Event>>>,
    gate: Arc<watch::Sender<bool>>,
}

impl Default for Journal {
    fn default() -> Self {
        Self {
            events: Arc::new(watch::channel(Vec::new()).0),
            gate: Arc::new(watch::channel(false).0),
        }
    }
}

impl Journal {
    pub fn push(&self, event: Event) {
        self.events.send_modify(|events| events.push(event));
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Everything except the receive calls.
    pub fn pipeline(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| *e != Event::Receive)
            .collect()
    }

    pub fn for_message(&self, id: &str) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.message_id() == Some(id))
            .collect()
    }

    pub fn contains(&self, event: &Event) -> bool {
        self.events.borrow().contains(event)
    }

    pub async fn wait_for(&self, event: &Event) {
        let mut rx = self.events.subscribe();
        let _ = rx.wait_for(|events| events.contains(event)).await;
    }

    /// Let every `gate` handler invocation return.
    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }
}

pub fn message(id: &str, body: &str) -> Message {
    Message::new(
        MessageId::new(id),
        ReceiptToken::new(format!("rcpt-{id}")),
        body,
    )
}

/// Queue that replays a fixed list of `receive` results, then idles like an
/// empty long poll.
pub struct ScriptedQueue {
    journal: Journal,
    script: Mutex<VecDeque<Result<Vec<Message>, QueueError>>>,
    receive_times: Mutex<Vec<Instant>>,
    fail_acks: AtomicBool,
    exhausted: watch::Sender<bool>,
}

impl ScriptedQueue {
    pub fn new(journal: Journal, script: Vec<Result<Vec<Message>, QueueError>>) -> Self {
        Self {
            journal,
            script: Mutex::new(script.into()),
            receive_times: Mutex::new(Vec::new()),
            fail_acks: AtomicBool::new(false),
            exhausted: watch::channel(false).0,
        }
    }

    pub fn fail_acks(&self, fail: bool) {
        self.fail_acks.store(fail, Ordering::SeqCst);
    }

    pub fn receive_times(&self) -> Vec<Instant> {
        self.receive_times.lock().unwrap().clone()
    }

    /// Resolves once `receive` has been called with nothing left to replay,
    /// i.e. every scripted batch went through the poller.
    pub async fn script_exhausted(&self) {
        let mut rx = self.exhausted.subscribe();
        let _ = rx.wait_for(|done| *done).await;
    }
}

#[async_trait]
impl Queue for ScriptedQueue {
    async fn receive(
        &self,
        _max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<Message>, QueueError> {
        self.journal.push(Event::Receive);
        self.receive_times.lock().unwrap().push(Instant::now());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => {
                self.exhausted.send_replace(true);
                tokio::time::sleep(wait).await;
                Ok(Vec::new())
            }
        }
    }

    async fn acknowledge(&self, message: &Message) -> Result<(), QueueError> {
        if self.fail_acks.load(Ordering::SeqCst) {
            return Err(QueueError::Transport("ack rejected".into()));
        }
        self.journal.push(Event::Acked(message.id.to_string()));
        Ok(())
    }

    async fn release(&self, message: &Message) -> Result<(), QueueError> {
        self.journal.push(Event::Released(message.id.to_string()));
        Ok(())
    }
}

/// InMemoryTaskStore that journals successful writes and can be told to fail.
pub struct RecordingStore {
    journal: Journal,
    inner: InMemoryTaskStore,
    fail_processing: AtomicBool,
    fail_terminal: AtomicBool,
}

impl RecordingStore {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            inner: InMemoryTaskStore::new(),
            fail_processing: AtomicBool::new(false),
            fail_terminal: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &InMemoryTaskStore {
        &self.inner
    }

    pub fn fail_processing(&self, fail: bool) {
        self.fail_processing.store(fail, Ordering::SeqCst);
    }

    pub fn fail_terminal(&self, fail: bool) {
        self.fail_terminal.store(fail, Ordering::SeqCst);
    }

    fn injected(flag: &AtomicBool) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskStore for RecordingStore {
    async fn upsert_processing(
        &self,
        message_id: &MessageId,
        worker_id: &WorkerId,
    ) -> Result<(), StoreError> {
        Self::injected(&self.fail_processing)?;
        self.inner.upsert_processing(message_id, worker_id).await?;
        self.journal.push(Event::Processing(message_id.to_string()));
        Ok(())
    }

    async fn upsert_completed(&self, message_id: &MessageId, result: Value) -> Result<(), StoreError> {
        Self::injected(&self.fail_terminal)?;
        self.inner.upsert_completed(message_id, result).await?;
        self.journal.push(Event::Completed(message_id.to_string()));
        Ok(())
    }

    async fn upsert_failed(&self, message_id: &MessageId, error_text: &str) -> Result<(), StoreError> {
        Self::injected(&self.fail_terminal)?;
        self.inner.upsert_failed(message_id, error_text).await?;
        self.journal.push(Event::Failed(message_id.to_string()));
        Ok(())
    }

    async fn status(&self, message_id: &MessageId) -> Result<Option<TaskStatus>, StoreError> {
        self.journal.push(Event::StatusChecked(message_id.to_string()));
        self.inner.status(message_id).await
    }
}

/// Registry with the handlers the app-layer tests dispatch to:
/// - `data`: `sum` / `count` over integers
/// - `fail`: fails with `payload.reason`
/// - `gate`: blocks until `Journal::open_gate`
/// - `panic`: panics
pub fn fixture_registry(journal: Journal) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    let handlers: [(&str, Arc<dyn TaskHandler>); 4] = [
        ("data", Arc::new(Data(journal.clone()))),
        ("fail", Arc::new(Fail(journal.clone()))),
        ("gate", Arc::new(Gate(journal.clone()))),
        ("panic", Arc::new(Panic(journal))),
    ];
    for (task_type, handler) in handlers {
        registry.register(task_type, handler).unwrap();
    }
    registry
}

struct Data(Journal);

#[async_trait]
impl TaskHandler for Data {
    async fn invoke(&self, payload: Value) -> Result<Value, HandlerError> {
        self.0.push(Event::Invoked("data".into()));
        let operation = payload["operation"].as_str().unwrap_or("sum").to_string();
        let data: Vec<i64> = payload["data"]
            .as_array()
            .map(|items| items.iter().filter_map(Value::as_i64).collect())
            .unwrap_or_default();
        let result = match operation.as_str() {
            "sum" => data.iter().sum::<i64>(),
            "count" => data.len() as i64,
            other => return Err(HandlerError::new(format!("unsupported operation: {other}"))),
        };
        Ok(json!({ "operation": operation, "result": result, "items_processed": data.len() }))
    }
}

struct Fail(Journal);

#[async_trait]
impl TaskHandler for Fail {
    async fn invoke(&self, payload: Value) -> Result<Value, HandlerError> {
        self.0.push(Event::Invoked("fail".into()));
        Err(HandlerError::new(
            payload["reason"].as_str().unwrap_or("failed"),
        ))
    }
}

struct Gate(Journal);

#[async_trait]
impl TaskHandler for Gate {
    async fn invoke(&self, _payload: Value) -> Result<Value, HandlerError> {
        self.0.push(Event::Invoked("gate".into()));
        let mut open = self.0.gate.subscribe();
        let _ = open.wait_for(|open| *open).await;
        Ok(json!({ "gate": "passed" }))
    }
}

struct Panic(Journal);

#[async_trait]
impl TaskHandler for Panic {
    async fn invoke(&self, _payload: Value) -> Result<Value, HandlerError> {
        self.0.push(Event::Invoked("panic".into()));
        panic!("handler blew up");
    }
}
