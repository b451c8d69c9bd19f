use crate::application::ports::connectivity::ConnectivitySource;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const TRANSITION_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectivityTransition {
    WentOnline,
    WentOffline,
}

/// Single source of truth for online state. Turns raw platform signals into deduplicated
/// transitions.
pub struct ConnectivityMonitor {
    source: Arc<dyn ConnectivitySource>,
    last_seen: AtomicBool,
    transitions: broadcast::Sender<ConnectivityTransition>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectivityMonitor {
    pub fn new(source: Arc<dyn ConnectivitySource>) -> Arc<Self> {
        let (transitions, _rx) = broadcast::channel(TRANSITION_CHANNEL_CAPACITY);
        let initial = source.is_online();
        Arc::new(Self {
            source,
            last_seen: AtomicBool::new(initial),
            transitions,
            listener: Mutex::new(None),
        })
    }

    /// Most recent state the platform reported.
    pub fn is_online(&self) -> bool {
        self.source.is_online()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityTransition> {
        self.transitions.subscribe()
    }

    /// Starts relaying platform signals. Calling it again while the relay runs does nothing.
    pub fn start(self: &Arc<Self>) {
        let Ok(mut listener) = self.listener.lock() else {
            tracing::error!(target: "outbox::connectivity", "listener slot poisoned");
            return;
        };
        if listener.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let mut rx = self.source.subscribe();
        self.observe(*rx.borrow_and_update());
        let monitor: Weak<Self> = Arc::downgrade(self);
        *listener = Some(tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                let Some(monitor) = monitor.upgrade() else {
                    break;
                };
                monitor.observe(online);
            }
            tracing::debug!(target: "outbox::connectivity", "connectivity relay stopped");
        }));
    }

    /// Records a platform signal and publishes a transition when the state actually changed.
    pub fn observe(&self, online: bool) -> Option<ConnectivityTransition> {
        let previous = self.last_seen.swap(online, Ordering::SeqCst);
        if previous == online {
            return None;
        }

        let transition = if online {
            ConnectivityTransition::WentOnline
        } else {
            ConnectivityTransition::WentOffline
        };
        tracing::info!(target: "outbox::connectivity", ?transition, "connectivity changed");
        // Err only means there are no receivers.
        let _ = self.transitions.send(transition);
        Some(transition)
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        if let Ok(mut listener) = self.listener.lock()
            && let Some(handle) = listener.take()
        {
            handle.abort();
        }
    }
}
