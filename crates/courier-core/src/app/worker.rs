//! Worker - N pollers over one queue, one store and one registry.
//!
//! # 構成
//! - `Worker`: `WorkerBuilder::build()` の結果。`run()` で処理開始
//! - `WorkerGroup`: poller を tokio task として spawn し、join で統計を集約
//!
//! # 終了処理
//! 1. `ShutdownSignal` で全 poller に停止を通知（実行中のハンドラは待つ）
//! 2. 全 poller の join
//! 3. Queue / TaskStore の `close()`

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::dispatcher::Dispatcher;
use super::lifecycle::LifecycleTracker;
use super::poller::{PollSettings, Poller};
use super::shutdown::ShutdownSignal;
use super::stats::PollerStats;
use crate::config::WorkerConfig;
use crate::domain::WorkerId;
use crate::ports::{Queue, TaskStore};
use crate::typed::HandlerRegistry;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("poller {index} terminated abnormally: {reason}")]
    PollerPanicked { index: usize, reason: String },
}

/// 起動済みの poller 群
pub struct WorkerGroup {
    handles: Vec<(usize, JoinHandle<PollerStats>)>,
}

impl WorkerGroup {
    /// 各 poller を spawn する（signal は poller ごとに clone）
    pub fn spawn(pollers: Vec<Poller>, signal: ShutdownSignal) -> Self {
        let handles = pollers
            .into_iter()
            .map(|poller| {
                let index = poller.index();
                let signal = signal.clone();
                let handle = tokio::spawn(async move { poller.run(signal).await });
                (index, handle)
            })
            .collect();
        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// 全 poller の終了を待ち、統計を合算する
    ///
    /// 1 つが異常終了しても残りの join は続ける。最初のエラーを返す。
    pub async fn join(self) -> Result<PollerStats, WorkerError> {
        let mut total = PollerStats::default();
        let mut first_error = None;
        for (index, handle) in self.handles {
            match handle.await {
                Ok(stats) => total.merge(&stats),
                Err(e) => {
                    error!(poller = index, error = %e, "poller terminated abnormally");
                    first_error.get_or_insert(WorkerError::PollerPanicked {
                        index,
                        reason: e.to_string(),
                    });
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(total),
        }
    }
}

/// Worker はタスク実行プロセス本体
pub struct Worker {
    id: WorkerId,
    config: WorkerConfig,
    queue: Arc<dyn Queue>,
    store: Arc<dyn TaskStore>,
    registry: Arc<HandlerRegistry>,
}

impl Worker {
    pub(crate) fn new(
        id: WorkerId,
        config: WorkerConfig,
        queue: Arc<dyn Queue>,
        store: Arc<dyn TaskStore>,
        registry: Arc<HandlerRegistry>,
    ) -> Self {
        Self {
            id,
            config,
            queue,
            store,
            registry,
        }
    }

    pub fn id(&self) -> &WorkerId {
        &self.id
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    fn pollers(&self) -> Vec<Poller> {
        let tracker = Arc::new(LifecycleTracker::new(self.store.clone(), self.id.clone()));
        let dispatcher = Arc::new(
            Dispatcher::new(self.registry.clone()).with_handler_timeout(self.config.handler_timeout),
        );
        let settings = PollSettings::from(&self.config);
        (0..self.config.concurrency.max(1))
            .map(|index| {
                Poller::new(
                    index,
                    self.queue.clone(),
                    tracker.clone(),
                    dispatcher.clone(),
                    settings.clone(),
                )
            })
            .collect()
    }

    /// shutdown が要求されるまで処理し、その後リソースを解放する
    pub async fn run(self, shutdown: ShutdownSignal) -> Result<PollerStats, WorkerError> {
        info!(
            worker_id = %self.id,
            concurrency = self.config.concurrency,
            max_messages = self.config.max_messages,
            wait_secs = self.config.wait_time.as_secs(),
            task_types = ?self.registry.registered_types(),
            "worker starting"
        );

        let group = WorkerGroup::spawn(self.pollers(), shutdown);
        let joined = group.join().await;

        if let Err(e) = self.queue.close().await {
            warn!(error = %e, "failed to close queue");
        }
        if let Err(e) = self.store.close().await {
            warn!(error = %e, "failed to close task store");
        }

        let stats = joined?;
        info!(
            worker_id = %self.id,
            completed = stats.completed,
            failed = stats.failed,
            duplicates = stats.duplicates,
            transport_errors = stats.transport_errors,
            "worker stopped"
        );
        Ok(stats)
    }
}
