//! コマンドライン引数 / 環境変数
//!
//! 全項目は `--flag` でも `COURIER_*` 環境変数でも指定できる（flag が優先）。
//! 範囲外の値は clap が起動時に弾く。

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use courier_core::WorkerConfig;
use courier_core::config::{MAX_BATCH, MAX_WAIT_SECONDS};
use courier_core::domain::WorkerId;

use crate::handlers::Latency;

#[derive(Parser, Debug)]
#[command(name = "courier")]
#[command(about = "Queue-driven task execution worker", long_about = None)]
pub struct Args {
    /// Worker ID (auto-generated if not provided)
    #[arg(long, env = "COURIER_WORKER_ID")]
    pub worker_id: Option<String>,

    /// Messages requested per receive
    #[arg(
        long,
        env = "COURIER_MAX_MESSAGES",
        default_value_t = 1,
        value_parser = clap::value_parser!(u64).range(1..=MAX_BATCH as u64)
    )]
    pub max_messages: u64,

    /// Long-poll wait per receive, in seconds
    #[arg(
        long,
        env = "COURIER_WAIT_SECONDS",
        default_value_t = MAX_WAIT_SECONDS,
        value_parser = clap::value_parser!(u64).range(..=MAX_WAIT_SECONDS)
    )]
    pub wait_seconds: u64,

    /// Pause after a failed receive, in seconds
    #[arg(long, env = "COURIER_ERROR_BACKOFF_SECONDS", default_value_t = 5)]
    pub error_backoff_seconds: u64,

    /// Number of pollers
    #[arg(
        long,
        env = "COURIER_CONCURRENCY",
        default_value_t = 1,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub concurrency: u64,

    /// Per-invocation handler timeout, in seconds (unbounded if not provided)
    #[arg(
        long,
        env = "COURIER_HANDLER_TIMEOUT_SECONDS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub handler_timeout_seconds: Option<u64>,

    /// How long a received message stays hidden, in seconds
    #[arg(
        long,
        env = "COURIER_VISIBILITY_TIMEOUT_SECONDS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub visibility_timeout_seconds: u64,

    /// Deliveries before a message is dead-lettered
    #[arg(
        long,
        env = "COURIER_MAX_RECEIVES",
        default_value_t = 5,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_receives: u32,

    /// JSON lines of message bodies to enqueue at startup
    #[arg(long, env = "COURIER_SEED_FILE")]
    pub seed_file: Option<PathBuf>,

    /// Sleep in the built-in handlers
    #[arg(
        long,
        env = "COURIER_SIMULATED_LATENCY",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub simulated_latency: bool,
}

impl Args {
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            worker_id: self.worker_id.as_deref().map(WorkerId::new),
            max_messages: self.max_messages as usize,
            wait_time: Duration::from_secs(self.wait_seconds),
            error_backoff: Duration::from_secs(self.error_backoff_seconds),
            concurrency: self.concurrency as usize,
            handler_timeout: self.handler_timeout_seconds.map(Duration::from_secs),
        }
    }

    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_seconds)
    }

    pub fn latency(&self) -> Latency {
        if self.simulated_latency {
            Latency::default()
        } else {
            Latency::none()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    fn parse(flags: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("courier").chain(flags.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.worker_config(), WorkerConfig::default());
        assert_eq!(args.visibility_timeout(), Duration::from_secs(30));
        assert_eq!(args.max_receives, 5);
        assert!(args.seed_file.is_none());
        assert!(args.simulated_latency);
    }

    #[test]
    fn test_every_setting_is_read() {
        let args = parse(&[
            "--worker-id",
            "worker-a",
            "--max-messages",
            "10",
            "--wait-seconds",
            "0",
            "--error-backoff-seconds",
            "2",
            "--concurrency",
            "4",
            "--handler-timeout-seconds",
            "30",
            "--visibility-timeout-seconds",
            "60",
            "--max-receives",
            "2",
            "--seed-file",
            "/tmp/tasks.jsonl",
            "--simulated-latency",
            "false",
        ])
        .unwrap();

        let config = args.worker_config();
        assert_eq!(config.worker_id, Some(WorkerId::new("worker-a")));
        assert_eq!(config.max_messages, 10);
        assert_eq!(config.wait_time, Duration::ZERO);
        assert_eq!(config.error_backoff, Duration::from_secs(2));
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.handler_timeout, Some(Duration::from_secs(30)));
        assert_eq!(args.visibility_timeout(), Duration::from_secs(60));
        assert_eq!(args.max_receives, 2);
        assert_eq!(args.seed_file, Some(PathBuf::from("/tmp/tasks.jsonl")));
        assert!(!args.simulated_latency);
    }

    #[rstest]
    #[case::batch_zero("--max-messages", "0")]
    #[case::batch_too_big("--max-messages", "11")]
    #[case::wait_too_long("--wait-seconds", "21")]
    #[case::not_a_number("--error-backoff-seconds", "five")]
    #[case::no_pollers("--concurrency", "0")]
    #[case::zero_timeout("--handler-timeout-seconds", "0")]
    #[case::zero_visibility("--visibility-timeout-seconds", "0")]
    #[case::no_receives("--max-receives", "none")]
    #[case::not_a_bool("--simulated-latency", "maybe")]
    fn test_rejects_invalid_values(#[case] flag: &str, #[case] value: &str) {
        let err = parse(&[flag, value]).unwrap_err();
        assert!(err.to_string().contains(flag), "{err}");
    }

    #[test]
    fn test_every_setting_has_an_env_var() {
        Args::command().debug_assert();
        for arg in Args::command().get_arguments() {
            if matches!(arg.get_id().as_str(), "help" | "version") {
                continue;
            }
            let env = arg
                .get_env()
                .unwrap_or_else(|| panic!("{} has no env var", arg.get_id()));
            assert!(env.to_string_lossy().starts_with("COURIER_"));
        }
    }
}
