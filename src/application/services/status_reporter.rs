use crate::application::ports::sync_event_sink::{SyncEvent, SyncEventSink};
use crate::domain::entities::{CycleEnd, DrainReport};
use crate::domain::value_objects::EntityKind;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// User-facing rendering of one outbox event. `event` keeps the structured data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusNotification {
    pub level: NotificationLevel,
    pub message: String,
    pub event: SyncEvent,
}

pub type StatusCallback = Arc<dyn Fn(&StatusNotification) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SubscriptionId(u64);

/// Translates outbox events into notifications and fans them out to subscribers.
#[derive(Default)]
pub struct StatusReporter {
    next_id: AtomicU64,
    subscribers: RwLock<Vec<(SubscriptionId, StatusCallback)>>,
}

impl StatusReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: StatusCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut subscribers) = self.subscribers.write() {
            subscribers.push((id, callback));
        }
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        match self.subscribers.write() {
            Ok(mut subscribers) => {
                let before = subscribers.len();
                subscribers.retain(|(existing, _)| *existing != id);
                subscribers.len() != before
            }
            Err(_) => false,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn translate(event: &SyncEvent) -> StatusNotification {
        let (level, message) = match event {
            SyncEvent::Queued { kind, .. } => (
                NotificationLevel::Info,
                format!(
                    "{} saved offline. It will sync when you're back online.",
                    kind_label(*kind)
                ),
            ),
            SyncEvent::CycleStarted => (
                NotificationLevel::Info,
                "Syncing offline changes".to_string(),
            ),
            SyncEvent::ItemCount { total: 0 } => {
                (NotificationLevel::Info, "Nothing to sync".to_string())
            }
            SyncEvent::ItemCount { total } => (
                NotificationLevel::Info,
                format!("Syncing {}", items(*total)),
            ),
            SyncEvent::ItemFailed { kind, error, .. } => (
                NotificationLevel::Warning,
                format!("{} could not be synced: {error}", kind_label(*kind)),
            ),
            SyncEvent::CycleFinished(report) => finished_message(report),
        };

        StatusNotification {
            level,
            message,
            event: event.clone(),
        }
    }
}

impl SyncEventSink for StatusReporter {
    fn emit(&self, event: &SyncEvent) {
        let notification = Self::translate(event);
        tracing::debug!(
            target: "outbox::reporter",
            level = ?notification.level,
            message = %notification.message,
            "status notification"
        );

        // Callbacks run outside the lock so they may unsubscribe themselves.
        let callbacks: Vec<StatusCallback> = match self.subscribers.read() {
            Ok(subscribers) => subscribers.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
            Err(_) => return,
        };
        for callback in callbacks {
            callback(&notification);
        }
    }
}

fn finished_message(report: &DrainReport) -> (NotificationLevel, String) {
    match &report.end {
        CycleEnd::Exhausted if report.attempted == 0 => {
            (NotificationLevel::Info, "Everything is up to date".to_string())
        }
        CycleEnd::Exhausted if report.failed == 0 => (
            NotificationLevel::Success,
            format!("Synced {}", items(report.succeeded)),
        ),
        CycleEnd::Exhausted => (
            NotificationLevel::Warning,
            format!(
                "Synced {} of {}; {} failed and can be reviewed in the outbox",
                report.succeeded,
                items(report.attempted),
                report.failed
            ),
        ),
        CycleEnd::Aborted { .. } => (
            NotificationLevel::Warning,
            format!(
                "Sync paused after {}. The rest will sync when the connection returns.",
                items(report.succeeded)
            ),
        ),
        CycleEnd::Errored { message } => (
            NotificationLevel::Error,
            format!("Sync stopped: {message}"),
        ),
    }
}

fn kind_label(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Expense => "Expense",
        EntityKind::Trip => "Trip",
    }
}

fn items(count: u32) -> String {
    if count == 1 {
        "1 item".to_string()
    } else {
        format!("{count} items")
    }
}
