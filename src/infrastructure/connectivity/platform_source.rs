use crate::application::ports::connectivity::ConnectivitySource;
use tokio::sync::watch;

/// Connectivity fed by platform glue. The host calls [`report`](Self::report) from its network
/// callback; nothing here polls.
pub struct PlatformConnectivitySource {
    tx: watch::Sender<bool>,
}

impl PlatformConnectivitySource {
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_online);
        Self { tx }
    }

    pub fn report(&self, online: bool) {
        self.tx.send_replace(online);
        tracing::trace!(target: "outbox::connectivity", online, "platform reported network state");
    }
}

impl Default for PlatformConnectivitySource {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConnectivitySource for PlatformConnectivitySource {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
