//! courier - キュー駆動のタスク実行ワーカー（in-memory 構成）
//!
//! # 起動の流れ
//! 1. tracing の初期化（`RUST_LOG`、既定 info）
//! 2. 引数 / `COURIER_*` 環境変数の読み込み（clap が検証）
//! 3. InMemoryQueue / InMemoryTaskStore を用意し、`--seed-file` を投入
//! 4. 組み込みハンドラを登録して Worker を構築（不足があれば起動失敗）
//! 5. SIGINT / SIGTERM で協調停止

mod args;
mod handlers;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use courier_core::domain::TaskEnvelope;
use courier_core::impls::{InMemoryQueue, InMemoryTaskStore};
use courier_core::{ShutdownController, WorkerBuilder};

use crate::args::Args;
use crate::handlers::TASK_TYPES;

/// Enqueue every non-blank line of `path` as a message body.
///
/// Lines are checked against the wire format first so a typo fails startup
/// instead of turning into a poison message.
async fn seed(queue: &InMemoryQueue, path: &Path) -> anyhow::Result<usize> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading seed file {}", path.display()))?;

    let mut sent = 0;
    for (lineno, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        TaskEnvelope::decode(line)
            .with_context(|| format!("{}:{}: not a task message", path.display(), lineno + 1))?;
        queue.send(line).await?;
        sent += 1;
    }
    Ok(sent)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args = Args::parse();

    let queue = Arc::new(
        InMemoryQueue::new(args.visibility_timeout()).with_max_receives(args.max_receives),
    );
    let store = Arc::new(InMemoryTaskStore::new());

    if let Some(path) = &args.seed_file {
        let sent = seed(&queue, path).await?;
        info!(count = sent, path = %path.display(), "seeded queue");
    }

    let builder = WorkerBuilder::new()
        .config(args.worker_config())
        .queue(queue.clone())
        .store(store.clone());
    let worker = handlers::register_all(builder, args.latency())?
        .expect_tasks(&TASK_TYPES)
        .build()?;

    let shutdown = ShutdownController::new();
    let listener = shutdown.listen_for_os_signals();

    let stats = worker.run(shutdown.signal()).await?;
    listener.abort();

    let counts = store.counts().await;
    info!(
        received = stats.received,
        acknowledged = queue.acknowledged_total().await,
        completed = counts.completed,
        failed = counts.failed,
        processing = counts.processing,
        "shutdown complete"
    );
    let dead = queue.dead_letters().await;
    if !dead.is_empty() {
        warn!(count = dead.len(), "messages dead-lettered");
    }
    Ok(())
}
