//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてワーカーの処理ロジックを実装します。
//!
//! # 主要コンポーネント
//! - **WorkerBuilder**: Worker の構築とワイヤリング（起動時検証）
//! - **Worker / WorkerGroup**: poller 群の起動・join・リソース解放
//! - **Poller**: receive → claim → dispatch → 終端書き込み → ack のループ
//! - **LifecycleTracker**: 状態遷移を TaskStore への書き込みに変換
//! - **Dispatcher**: メッセージ本文のデコードとハンドラ呼び出し
//! - **ShutdownController**: 協調的な停止

pub mod builder;
pub mod dispatcher;
pub mod lifecycle;
pub mod poller;
pub mod shutdown;
pub mod stats;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, WorkerBuilder};
pub use self::dispatcher::Dispatcher;
pub use self::lifecycle::{Claim, LifecycleTracker};
pub use self::poller::{PollSettings, Poller, ProcessOutcome};
pub use self::shutdown::{ShutdownController, ShutdownSignal, wait_for_termination};
pub use self::stats::PollerStats;
pub use self::worker::{Worker, WorkerError, WorkerGroup};
