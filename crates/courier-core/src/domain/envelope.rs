//! TaskEnvelope - the decoded message body.
//!
//! Wire format (JSON):
//! ```text
//! { "task_id": "t1", "type": "data", "payload": { ... } }
//! ```
//! `payload` is opaque to the engine and defaults to `{}` when absent or `null`.
//! `task_id` may arrive as a string or a number; numbers are kept as their
//! decimal text.

use serde::{Deserialize, Deserializer, Serialize};

use super::{TaskId, TaskType};

/// TaskType + Payload (+ TaskId), as carried in a queue message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    #[serde(deserialize_with = "task_id_from_string_or_number")]
    task_id: TaskId,
    #[serde(rename = "type")]
    task_type: TaskType,
    #[serde(default = "empty_payload", deserialize_with = "payload_or_empty")]
    payload: serde_json::Value,
}

fn empty_payload() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn payload_or_empty<'de, D>(deserializer: D) -> Result<serde_json::Value, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => empty_payload(),
        other => other,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTaskId {
    Text(String),
    Number(serde_json::Number),
}

fn task_id_from_string_or_number<'de, D>(deserializer: D) -> Result<TaskId, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawTaskId::deserialize(deserializer)? {
        RawTaskId::Text(s) => TaskId::new(s),
        RawTaskId::Number(n) => TaskId::new(n.to_string()),
    })
}

impl TaskEnvelope {
    pub fn new(task_id: TaskId, task_type: TaskType, payload: serde_json::Value) -> Self {
        Self {
            task_id,
            task_type,
            payload,
        }
    }

    /// Decode a raw message body.
    pub fn decode(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// Encode into the wire format (used by producers and tests).
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn task_type(&self) -> &TaskType {
        &self.task_type
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn into_payload(self) -> serde_json::Value {
        self.payload
    }
}
