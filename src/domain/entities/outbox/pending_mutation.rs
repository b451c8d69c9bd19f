use super::MutationPayload;
use crate::domain::value_objects::{EntityKind, IdempotencyKey, MutationId, MutationStatus};
use chrono::{DateTime, Utc};

/// Payload plus idempotency key, ready to be written to the outbox.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationDraft {
    pub idempotency_key: IdempotencyKey,
    pub payload: MutationPayload,
}

impl MutationDraft {
    pub fn new(payload: MutationPayload) -> Self {
        Self {
            idempotency_key: IdempotencyKey::generate(),
            payload,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.payload.kind()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingMutation {
    pub id: MutationId,
    pub idempotency_key: IdempotencyKey,
    pub payload: MutationPayload,
    pub status: MutationStatus,
    pub created_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl PendingMutation {
    pub fn new(
        id: MutationId,
        idempotency_key: IdempotencyKey,
        payload: MutationPayload,
        status: MutationStatus,
        created_at: DateTime<Utc>,
        last_error: Option<String>,
    ) -> Self {
        Self {
            id,
            idempotency_key,
            payload,
            status,
            created_at,
            last_error,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.payload.kind()
    }

    pub fn is_failed(&self) -> bool {
        self.status == MutationStatus::Failed
    }
}
