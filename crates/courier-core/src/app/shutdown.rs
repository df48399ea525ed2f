//! Cooperative shutdown.
//!
//! A `watch` channel carries one bit: "stop taking new work". Pollers check it
//! before every `receive()` and race it against the long poll; nothing ever
//! interrupts a handler that is already running.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Owner side: requests shutdown.
#[derive(Clone)]
pub struct ShutdownController {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// A receiver for one poller (or anything else that must stop).
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Idempotent; works whether or not any signal is alive.
    pub fn request_shutdown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_requested(&self) -> bool {
        *self.tx.borrow()
    }

    /// Spawn a task that requests shutdown on SIGINT or SIGTERM.
    pub fn listen_for_os_signals(&self) -> JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move {
            match wait_for_termination().await {
                Ok(signal) => {
                    info!(signal, "termination signal received, finishing in-flight work");
                    controller.request_shutdown();
                }
                Err(e) => error!(error = %e, "failed to install signal handlers"),
            }
        })
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Poller side: observes the shutdown request.
///
/// A dropped controller counts as a shutdown request.
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn is_requested(&self) -> bool {
        let stop = *self.rx.borrow();
        stop || self.rx.has_changed().is_err()
    }

    /// Resolves once shutdown has been requested. Cancel-safe.
    pub async fn requested(&mut self) {
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}

/// Wait for SIGINT (Ctrl-C) or, on unix, SIGTERM. Returns the signal name.
pub async fn wait_for_termination() -> std::io::Result<&'static str> {
    tokio::select! {
        r = tokio::signal::ctrl_c() => r.map(|_| "SIGINT"),
        r = terminate() => r.map(|_| "SIGTERM"),
    }
}

#[cfg(unix)]
async fn terminate() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut stream = signal(SignalKind::terminate())?;
    stream.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn terminate() -> std::io::Result<()> {
    std::future::pending().await
}
