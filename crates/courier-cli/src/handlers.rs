//! 組み込みハンドラ（デモ用）
//!
//! 外部システム（SMTP, ファイルストレージ, スクリプト実行環境）には触れず、
//! 一定時間 sleep して結果を返すだけ。`data` は実際に計算し、`api` は実際に
//! HTTP リクエストを送る。

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::sleep;
use tracing::{info, warn};

use courier_core::WorkerBuilder;
use courier_core::domain::HandlerError;
use courier_core::typed::{Handler, Task};

/// Every task type this binary can handle.
pub const TASK_TYPES: [&str; 6] = [
    DataTask::TYPE,
    EmailTask::TYPE,
    FileTask::TYPE,
    ApiTask::TYPE,
    ScriptTask::TYPE,
    ReportTask::TYPE,
];

/// Simulated latency per handler.
#[derive(Debug, Clone, Copy)]
pub struct Latency {
    pub data: Duration,
    pub email: Duration,
    pub file: Duration,
    pub script: Duration,
    pub report: Duration,
}

impl Default for Latency {
    fn default() -> Self {
        Self {
            data: Duration::from_secs(1),
            email: Duration::from_secs(2),
            file: Duration::from_secs(3),
            script: Duration::from_secs(5),
            report: Duration::from_secs(10),
        }
    }
}

impl Latency {
    pub fn none() -> Self {
        Self {
            data: Duration::ZERO,
            email: Duration::ZERO,
            file: Duration::ZERO,
            script: Duration::ZERO,
            report: Duration::ZERO,
        }
    }
}

/// 全ハンドラを builder に登録
pub fn register_all(builder: WorkerBuilder, latency: Latency) -> anyhow::Result<WorkerBuilder> {
    let builder = builder
        .register_typed::<DataTask, _>(DataHandler { delay: latency.data })?
        .register_typed::<EmailTask, _>(EmailHandler { delay: latency.email })?
        .register_typed::<FileTask, _>(FileHandler { delay: latency.file })?
        .register_typed::<ApiTask, _>(ApiHandler::new()?)?
        .register_typed::<ScriptTask, _>(ScriptHandler { delay: latency.script })?
        .register_typed::<ReportTask, _>(ReportHandler { delay: latency.report })?;
    Ok(builder)
}

// ========================================
// data
// ========================================

#[derive(Debug, Deserialize)]
pub struct DataTask {
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub data: Vec<Value>,
}

impl Task for DataTask {
    const TYPE: &'static str = "data";
}

pub struct DataHandler {
    pub delay: Duration,
}

impl DataTask {
    fn numbers(&self) -> Result<Vec<f64>, HandlerError> {
        self.data
            .iter()
            .map(|v| {
                v.as_f64()
                    .ok_or_else(|| HandlerError::new(format!("data item is not a number: {v}")))
            })
            .collect()
    }
}

/// Whole results stay integers on the wire (`6`, not `6.0`).
fn number(x: f64) -> Value {
    if x.fract() == 0.0 && x.abs() < 9_007_199_254_740_992.0 {
        json!(x as i64)
    } else {
        json!(x)
    }
}

#[async_trait]
impl Handler<DataTask> for DataHandler {
    type Output = Value;

    async fn handle(&self, task: DataTask) -> Result<Self::Output, HandlerError> {
        info!(operation = ?task.operation, "processing data operation");

        let result = match task.operation.as_deref() {
            Some("sum") => number(task.numbers()?.iter().sum()),
            Some("average") => {
                let numbers = task.numbers()?;
                if numbers.is_empty() {
                    json!(0)
                } else {
                    number(numbers.iter().sum::<f64>() / numbers.len() as f64)
                }
            }
            Some("count") => json!(task.data.len()),
            _ => Value::Array(task.data.clone()),
        };

        sleep(self.delay).await;
        Ok(json!({
            "operation": task.operation,
            "result": result,
            "items_processed": task.data.len(),
        }))
    }
}

// ========================================
// email
// ========================================

#[derive(Debug, Deserialize)]
pub struct EmailTask {
    pub recipient: Option<String>,
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl Task for EmailTask {
    const TYPE: &'static str = "email";
}

pub struct EmailHandler {
    pub delay: Duration,
}

#[async_trait]
impl Handler<EmailTask> for EmailHandler {
    type Output = Value;

    async fn handle(&self, task: EmailTask) -> Result<Self::Output, HandlerError> {
        info!(
            recipient = ?task.recipient,
            subject = ?task.subject,
            body_len = task.body.as_deref().map_or(0, str::len),
            "sending email"
        );
        sleep(self.delay).await;
        Ok(json!({
            "status": "sent",
            "recipient": task.recipient,
            "timestamp": chrono::Utc::now().timestamp_millis(),
        }))
    }
}

// ========================================
// file
// ========================================

#[derive(Debug, Deserialize)]
pub struct FileTask {
    pub operation: Option<String>,
    pub file_path: Option<String>,
}

impl Task for FileTask {
    const TYPE: &'static str = "file";
}

pub struct FileHandler {
    pub delay: Duration,
}

#[async_trait]
impl Handler<FileTask> for FileHandler {
    type Output = Value;

    async fn handle(&self, task: FileTask) -> Result<Self::Output, HandlerError> {
        info!(operation = ?task.operation, file_path = ?task.file_path, "processing file operation");
        sleep(self.delay).await;
        Ok(json!({
            "operation": task.operation,
            "file_path": task.file_path,
            "status": "completed",
            "size_bytes": 1024,
        }))
    }
}

// ========================================
// api
// ========================================

#[derive(Debug, Deserialize)]
pub struct ApiTask {
    pub url: Option<String>,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub data: Option<Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl Task for ApiTask {
    const TYPE: &'static str = "api";
}

/// Makes the HTTP call described by the payload.
///
/// Transport errors and non-2xx responses are not handler failures: they come
/// back as `{"error": ..., "status": "failed"}` and the task completes.
pub struct ApiHandler {
    client: reqwest::Client,
}

impl ApiHandler {
    pub const TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(Self::TIMEOUT).build()?;
        Ok(Self { client })
    }

    async fn call(&self, task: &ApiTask) -> Result<Value, String> {
        let url = task.url.as_deref().ok_or("url is required")?;
        let method = reqwest::Method::from_bytes(task.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| e.to_string())?;

        let mut request = self.client.request(method, url);
        for (name, value) in &task.headers {
            request = request.header(name, value);
        }
        if let Some(data) = &task.data {
            request = request.json(data);
        }

        let response = request
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| e.to_string())?;

        let status_code = response.status().as_u16();
        let headers: serde_json::Map<String, Value> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
                (name.as_str().to_string(), Value::String(value))
            })
            .collect();
        let text = response.text().await.map_err(|e| e.to_string())?;
        // JSON bodies are returned parsed, anything else as text.
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok(json!({
            "status_code": status_code,
            "response": body,
            "headers": headers,
        }))
    }
}

#[async_trait]
impl Handler<ApiTask> for ApiHandler {
    type Output = Value;

    async fn handle(&self, task: ApiTask) -> Result<Self::Output, HandlerError> {
        info!(method = %task.method, url = ?task.url, "making api call");
        match self.call(&task).await {
            Ok(output) => Ok(output),
            Err(error) => {
                warn!(url = ?task.url, %error, "api call failed");
                Ok(json!({"error": error, "status": "failed"}))
            }
        }
    }
}

// ========================================
// script
// ========================================

#[derive(Debug, Deserialize)]
pub struct ScriptTask {
    pub script_name: Option<String>,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl Task for ScriptTask {
    const TYPE: &'static str = "script";
}

pub struct ScriptHandler {
    pub delay: Duration,
}

#[async_trait]
impl Handler<ScriptTask> for ScriptHandler {
    type Output = Value;

    async fn handle(&self, task: ScriptTask) -> Result<Self::Output, HandlerError> {
        info!(script = ?task.script_name, args = task.args.len(), "executing script");
        sleep(self.delay).await;
        Ok(json!({
            "script": task.script_name,
            "args": task.args,
            "exit_code": 0,
            "output": "Script executed successfully",
        }))
    }
}

// ========================================
// report
// ========================================

#[derive(Debug, Deserialize)]
pub struct ReportTask {
    pub report_type: Option<String>,
    #[serde(default)]
    pub parameters: serde_json::Map<String, Value>,
}

impl Task for ReportTask {
    const TYPE: &'static str = "report";
}

pub struct ReportHandler {
    pub delay: Duration,
}

#[async_trait]
impl Handler<ReportTask> for ReportHandler {
    type Output = Value;

    async fn handle(&self, task: ReportTask) -> Result<Self::Output, HandlerError> {
        let report_type = task.report_type.unwrap_or_else(|| "report".to_string());
        info!(%report_type, parameters = task.parameters.len(), "generating report");
        sleep(self.delay).await;
        Ok(json!({
            "report_type": report_type,
            "status": "generated",
            "file_url": format!("/reports/{report_type}_{}.pdf", chrono::Utc::now().timestamp()),
            "pages": 42,
        }))
    }
}
