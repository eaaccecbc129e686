//! Cancellation for long-running installs
//!
//! A [`Cancellation`] is a cheap, cloneable flag shared between the caller,
//! the orchestrator and its fetch workers. Child tokens observe their parent
//! but cancelling a child leaves the parent untouched, which lets the
//! orchestrator abort its own workers after a failure without reporting the
//! caller as cancelled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Cancellation {
    /// Own flag last, ancestors before it
    flags: Vec<Arc<AtomicBool>>,
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl Cancellation {
    pub fn new() -> Self {
        Self {
            flags: vec![Arc::new(AtomicBool::new(false))],
        }
    }

    /// Token that is cancelled when either it or `self` is cancelled.
    pub fn child(&self) -> Self {
        let mut flags = self.flags.clone();
        flags.push(Arc::new(AtomicBool::new(false)));
        Self { flags }
    }

    pub fn cancel(&self) {
        if let Some(own) = self.flags.last() {
            own.store(true, Ordering::SeqCst);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.flags.iter().any(|f| f.load(Ordering::SeqCst))
    }
}

/// Cancels a token once a timeout expires, unless dropped first.
///
/// Dropping the watchdog stops its thread without cancelling anything.
pub struct Watchdog {
    stop: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

/// Start a watchdog that cancels `token` after `timeout`.
pub fn cancel_after(token: Cancellation, timeout: Duration) -> Watchdog {
    let (tx, rx) = mpsc::channel::<()>();

    let handle = thread::spawn(move || {
        // A message or a disconnected sender both mean "stop watching"
        if let Err(mpsc::RecvTimeoutError::Timeout) = rx.recv_timeout(timeout) {
            tracing::warn!(timeout_secs = timeout.as_secs_f64(), "timeout expired, cancelling");
            token.cancel();
        }
    });

    Watchdog {
        stop: Some(tx),
        handle: Some(handle),
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
