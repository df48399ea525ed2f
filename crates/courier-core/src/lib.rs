//! courier-core
//!
//! Queue-driven task execution engine: receives messages, tracks each task's
//! lifecycle in a store, dispatches to a handler per task type and
//! acknowledges once the outcome is durable.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task_type, envelope, message, state, record, errors）
//! - **ports**: 抽象化レイヤー（Queue, TaskStore, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（builder, worker, poller, lifecycle, dispatcher, shutdown）
//! - **typed**: 型付き Task API（Task trait, Handler trait, HandlerRegistry）
//! - **impls**: 実装（InMemoryQueue, InMemoryTaskStore など開発用）
//! - **config**: WorkerConfig（既定値と上限）

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod typed;

pub use crate::app::{ShutdownController, Worker, WorkerBuilder};
pub use crate::config::WorkerConfig;
