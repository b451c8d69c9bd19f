use tokio::sync::watch;

/// Platform network-state notifications. No probing; the source only relays what the platform
/// reports.
pub trait ConnectivitySource: Send + Sync {
    fn is_online(&self) -> bool;

    /// Receiver that observes every state the platform reports.
    fn subscribe(&self) -> watch::Receiver<bool>;
}
