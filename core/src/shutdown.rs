//! Broadcast-once shutdown signal

use tokio::sync::broadcast;

/// Process-wide cancellation signal shared by the coordinator and all workers
///
/// Triggering is idempotent: however many code paths race to stop the run
/// (interrupt handler, duration timer, a fatally failing worker), receivers
/// observe shutdown exactly once and later triggers are no-ops.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: broadcast::Sender<()>,
}

impl ShutdownSignal {
    /// Create an untriggered signal.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Broadcast shutdown. Safe to call any number of times, including with
    /// no receivers subscribed.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Subscribe to the signal. A receiver created before the first trigger
    /// sees it; the channel capacity of one collapses repeated triggers.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
