//! Cooperative cancellation
//!
//! A [`Shutdown`] is a cloneable flag plus a wake-up channel. The poll loop
//! checks the flag between readings and waits on the channel during the
//! inter-sweep pause, so an interrupt is observed within one read.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{IngestError, Result};

#[derive(Debug, Clone)]
pub struct Shutdown {
    triggered: Arc<AtomicBool>,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (wake_tx, wake_rx) = bounded(1);
        Self {
            triggered: Arc::new(AtomicBool::new(false)),
            wake_tx,
            wake_rx,
        }
    }

    /// Request cancellation and wake any waiter
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        // A full channel already holds a pending wake-up
        let _ = self.wake_tx.try_send(());
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Sleep for `timeout` unless cancelled first
    ///
    /// Returns `true` if cancellation was requested.
    pub fn wait(&self, timeout: Duration) -> bool {
        if self.is_triggered() {
            return true;
        }
        match self.wake_rx.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                // Re-arm for other clones that may also be waiting
                let _ = self.wake_tx.try_send(());
                true
            }
            Err(RecvTimeoutError::Timeout) => self.is_triggered(),
        }
    }

    /// Trigger on SIGINT/SIGTERM (Ctrl+C)
    ///
    /// Can only be installed once per process.
    pub fn install_interrupt_handler(&self) -> Result<()> {
        let shutdown = self.clone();
        ctrlc::set_handler(move || {
            tracing::info!("Interrupt received, draining");
            shutdown.trigger();
        })
        .map_err(|e| IngestError::Config(format!("Failed to install interrupt handler: {}", e)))
    }
}
