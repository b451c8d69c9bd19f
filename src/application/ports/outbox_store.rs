use crate::domain::entities::{MutationDraft, PendingMutation};
use crate::domain::value_objects::{EntityKind, MutationId};
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Local durable queue of mutations waiting for the server.
///
/// Every single-record transition is atomic on its own; there are no cross-record transactions.
/// Transitions on an id that no longer exists fail with [`AppError::NotFound`].
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Inserts a PENDING record stamped with the current time. Storage failures are returned to
    /// the caller and leave no partial row behind.
    async fn enqueue(&self, draft: MutationDraft) -> Result<MutationId, AppError>;

    /// Drainable records of `kind` (PENDING, plus SYNCING left by an interrupted cycle), in
    /// enqueue order.
    async fn list_pending(&self, kind: EntityKind) -> Result<Vec<PendingMutation>, AppError>;

    async fn list_failed(&self, kind: EntityKind) -> Result<Vec<PendingMutation>, AppError>;

    async fn get(
        &self,
        kind: EntityKind,
        id: MutationId,
    ) -> Result<Option<PendingMutation>, AppError>;

    async fn mark_syncing(&self, kind: EntityKind, id: MutationId) -> Result<(), AppError>;

    /// Puts a record back to PENDING and clears its error.
    async fn mark_pending(&self, kind: EntityKind, id: MutationId) -> Result<(), AppError>;

    async fn mark_failed(
        &self,
        kind: EntityKind,
        id: MutationId,
        error: &str,
    ) -> Result<(), AppError>;

    async fn remove(&self, kind: EntityKind, id: MutationId) -> Result<(), AppError>;

    /// Number of records still in the outbox, across all kinds when `kind` is `None`.
    async fn count(&self, kind: Option<EntityKind>) -> Result<u64, AppError>;

    /// Resets SYNCING rows left by a crash back to PENDING. Returns how many were reset.
    async fn recover_in_flight(&self) -> Result<u64, AppError>;
}
