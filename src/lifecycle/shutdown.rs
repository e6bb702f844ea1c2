//! Stop coordination for a running hub.

use tokio::runtime::Handle;
use tokio::sync::broadcast;

/// Broadcast stop signal shared by the hub's serve loop and its controller.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new stop signal.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the stop signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the signal. Returns whether anything was listening.
    pub fn trigger(&self) -> bool {
        self.tx.send(()).is_ok()
    }

    /// Enqueue the trigger as a task on `runtime` instead of firing it inline.
    ///
    /// Safe to call from any thread, including while the loop is busy with
    /// one of its own callbacks.
    pub fn schedule_on(&self, runtime: &Handle) {
        let signal = self.clone();
        runtime.spawn(async move {
            if !signal.trigger() {
                tracing::debug!("Stop requested but the hub was no longer listening");
            }
        });
    }

    /// Number of receivers still waiting on the signal.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_without_listeners() {
        let shutdown = Shutdown::new();
        assert_eq!(shutdown.receiver_count(), 0);
        assert!(!shutdown.trigger());
    }

    #[tokio::test]
    async fn test_scheduled_trigger_reaches_subscriber() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();

        shutdown.schedule_on(&Handle::current());
        rx.recv().await.unwrap();
    }
}
