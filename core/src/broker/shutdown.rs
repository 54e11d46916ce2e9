use tokio::sync::watch;

/// Receiving half of the broker's shutdown signal.
///
/// Backed by a `watch` channel, so a receiver created after shutdown was
/// signalled still observes it. Dropping the sending side counts as shutdown.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown has been signalled.
    pub async fn recv(&mut self) {
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}
