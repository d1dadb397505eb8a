use crate::application::ports::connectivity::ConnectivityProvider;
use tokio::sync::watch;

/// Watch-channel backed connectivity state. The host feeds online/offline
/// events into `set_online`; the dispatcher and sync engine observe.
pub struct ConnectivityMonitor {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (tx, rx) = watch::channel(initially_online);
        Self { tx, rx }
    }

    pub fn set_online(&self, online: bool) {
        // send only fails with no receivers; we always hold one.
        if self.tx.send(online).is_ok() {
            tracing::debug!(target: "connectivity", online, "connectivity changed");
        }
    }
}

impl ConnectivityProvider for ConnectivityMonitor {
    fn is_online(&self) -> bool {
        *self.rx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.rx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_and_broadcasts_transitions() {
        let monitor = ConnectivityMonitor::new(false);
        assert!(!monitor.is_online());

        let mut rx = monitor.subscribe();
        monitor.set_online(true);
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
        assert!(monitor.is_online());
    }
}
