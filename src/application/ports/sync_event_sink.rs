use crate::domain::entities::DrainReport;
use crate::domain::value_objects::{EntityKind, MutationId};
use serde::Serialize;

/// Lifecycle events of the outbox, consumed by the status reporter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    Queued {
        kind: EntityKind,
        id: MutationId,
    },
    CycleStarted,
    ItemCount {
        total: u32,
    },
    ItemFailed {
        kind: EntityKind,
        id: MutationId,
        error: String,
    },
    CycleFinished(DrainReport),
}

pub trait SyncEventSink: Send + Sync {
    fn emit(&self, event: &SyncEvent);
}
