//! WorkerBuilder - Worker の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 開発体験の改善（明確なエラーメッセージ）

use std::sync::Arc;

use crate::config::WorkerConfig;
use crate::ports::{IdGenerator, Queue, SystemClock, TaskStore, UlidGenerator};
use crate::typed::{Handler, HandlerRegistry, RegistryError, Task, TaskHandler};

use super::worker::Worker;

/// WorkerBuilder は Worker を構築
///
/// # 使用例
/// ```ignore
/// let worker = WorkerBuilder::new()
///     .config(args.worker_config())
///     .queue(queue)
///     .store(store)
///     .register_typed::<SendEmail, _>(SendEmailHandler)?
///     .expect_tasks(&["email"])
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - expect_tasks() で期待される task_type を登録
/// - build() 時に「期待集合 ⊆ 登録済み集合」をチェック
/// - Queue / TaskStore が未設定でも BuildError
pub struct WorkerBuilder {
    config: WorkerConfig,
    registry: HandlerRegistry,
    queue: Option<Arc<dyn Queue>>,
    store: Option<Arc<dyn TaskStore>>,
    id_generator: Option<Box<dyn IdGenerator>>,
    expected_tasks: Option<Vec<String>>,
}

/// BuildError は Worker 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing task types: {0:?}. These tasks were expected but not registered.")]
    MissingTaskTypes(Vec<String>),

    #[error("no queue configured")]
    MissingQueue,

    #[error("no task store configured")]
    MissingStore,
}

impl WorkerBuilder {
    /// 新しい WorkerBuilder を作成
    pub fn new() -> Self {
        Self {
            config: WorkerConfig::default(),
            registry: HandlerRegistry::new(),
            queue: None,
            store: None,
            id_generator: None,
            expected_tasks: None,
        }
    }

    pub fn config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn queue(mut self, queue: Arc<dyn Queue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// worker_id の採番方法を差し替える（config に worker_id があればそちらが優先）
    pub fn id_generator(mut self, generator: impl IdGenerator + 'static) -> Self {
        self.id_generator = Some(Box::new(generator));
        self
    }

    /// 生の Handler を登録
    pub fn register(
        mut self,
        task_type: &str,
        handler: Arc<dyn TaskHandler>,
    ) -> Result<Self, RegistryError> {
        self.registry.register(task_type, handler)?;
        Ok(self)
    }

    /// 型付き Handler を登録
    ///
    /// # Example
    /// ```ignore
    /// builder.register_typed::<DataTask, _>(DataHandler::default())?;
    /// ```
    pub fn register_typed<T: Task, H: Handler<T> + 'static>(
        mut self,
        handler: H,
    ) -> Result<Self, RegistryError> {
        self.registry.register_typed::<T, H>(handler)?;
        Ok(self)
    }

    /// 期待される task_type のリストを設定
    pub fn expect_tasks(mut self, task_types: &[&str]) -> Self {
        self.expected_tasks = Some(task_types.iter().map(|t| t.to_string()).collect());
        self
    }

    /// WorkerBuilder を構築して Worker を生成
    ///
    /// # 検証
    /// - expect_tasks() で設定された task_type が全て登録されているかチェック
    /// - Queue / TaskStore が設定されているかチェック
    pub fn build(self) -> Result<Worker, BuildError> {
        if let Some(expected_tasks) = &self.expected_tasks {
            let missing_tasks: Vec<String> = expected_tasks
                .iter()
                .filter(|t| !self.registry.contains(t.as_str()))
                .cloned()
                .collect();
            if !missing_tasks.is_empty() {
                return Err(BuildError::MissingTaskTypes(missing_tasks));
            }
        }
        let queue = self.queue.ok_or(BuildError::MissingQueue)?;
        let store = self.store.ok_or(BuildError::MissingStore)?;

        let id = match (&self.config.worker_id, self.id_generator) {
            (Some(id), _) => id.clone(),
            (None, Some(generator)) => generator.generate_worker_id(),
            (None, None) => UlidGenerator::new(SystemClock).generate_worker_id(),
        };

        Ok(Worker::new(
            id,
            self.config,
            queue,
            store,
            Arc::new(self.registry),
        ))
    }
}

impl Default for WorkerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
