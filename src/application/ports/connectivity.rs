use tokio::sync::watch;

/// Host-fed connectivity signal. The dispatcher reads it fresh on every
/// call; the sync engine consumes the watch channel for offline-to-online
/// edges.
pub trait ConnectivityProvider: Send + Sync {
    fn is_online(&self) -> bool;
    fn subscribe(&self) -> watch::Receiver<bool>;
}
