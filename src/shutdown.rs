//! Broadcast cancellation shared by every stage of a pipeline.
//!
//! A [`Shutdown`] wraps a channel on which nothing is ever sent. Triggering it
//! drops the only sender, which disconnects the channel, and a disconnected
//! receiver is ready forever for every clone at once. Stages therefore put
//! [`Shutdown::receiver`] into their `select!` next to their data channels and
//! all of them wake on a single trigger, no matter how many are waiting.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Never constructed; the signal channel only ever reports disconnection.
#[derive(Debug)]
pub enum Never {}

/// Write-once, broadcast-readable cancellation signal.
///
/// Cheap to clone; all clones observe the same trigger.
#[derive(Debug, Clone)]
pub struct Shutdown {
    trigger: Arc<Mutex<Option<Sender<Never>>>>,
    signal: Receiver<Never>,
}

impl Shutdown {
    /// Create a signal that has not fired yet
    pub fn new() -> Self {
        let (tx, rx) = channel::bounded(0);
        Self {
            trigger: Arc::new(Mutex::new(Some(tx))),
            signal: rx,
        }
    }

    /// Fire the signal.
    ///
    /// Returns `true` only for the call that actually fired it; later calls
    /// are no-ops and return `false`.
    pub fn trigger(&self) -> bool {
        let sender = self.trigger.lock().take();
        match sender {
            Some(sender) => {
                drop(sender);
                info!("shutdown triggered");
                true
            }
            None => false,
        }
    }

    /// Check whether the signal has fired
    pub fn is_triggered(&self) -> bool {
        self.trigger.lock().is_none()
    }

    /// Receiver that becomes permanently ready once the signal fires.
    ///
    /// Use it as a `recv` arm in `crossbeam::select!`; the arm yields
    /// `Err(RecvError)` on cancellation.
    pub fn receiver(&self) -> &Receiver<Never> {
        &self.signal
    }

    /// Block until the signal fires
    pub fn wait(&self) {
        // Only disconnection can end this recv
        let _ = self.signal.recv();
    }

    /// Block until the signal fires or `timeout` elapses.
    ///
    /// Returns `true` if the signal fired.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        matches!(
            self.signal.recv_timeout(timeout),
            Err(RecvTimeoutError::Disconnected)
        )
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
