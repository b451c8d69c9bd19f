use crate::application::ports::outbox_store::OutboxStore;
use crate::application::ports::sync_event_sink::{SyncEvent, SyncEventSink};
use crate::domain::entities::{MutationDraft, MutationPayload, PendingMutation};
use crate::domain::value_objects::{EntityKind, MutationId};
use crate::shared::error::AppError;
use std::sync::Arc;

/// Save-offline entry point and the operations behind the outbox view.
pub struct OutboxService {
    store: Arc<dyn OutboxStore>,
    sink: Arc<dyn SyncEventSink>,
}

impl OutboxService {
    pub fn new(store: Arc<dyn OutboxStore>, sink: Arc<dyn SyncEventSink>) -> Self {
        Self { store, sink }
    }

    /// Queues a record for later replay. Storage failures are returned as-is.
    pub async fn save_mutation_offline(
        &self,
        payload: MutationPayload,
    ) -> Result<MutationId, AppError> {
        let draft = MutationDraft::new(payload);
        let kind = draft.kind();
        let id = self.store.enqueue(draft).await?;

        tracing::info!(target: "outbox::store", kind = %kind, id = id.value(), "mutation saved offline");
        self.sink.emit(&SyncEvent::Queued { kind, id });
        Ok(id)
    }

    pub async fn list_pending(
        &self,
        kind: Option<EntityKind>,
    ) -> Result<Vec<PendingMutation>, AppError> {
        let mut records = Vec::new();
        for kind in kinds(kind) {
            records.extend(self.store.list_pending(kind).await?);
        }
        Ok(records)
    }

    pub async fn list_failed(
        &self,
        kind: Option<EntityKind>,
    ) -> Result<Vec<PendingMutation>, AppError> {
        let mut records = Vec::new();
        for kind in kinds(kind) {
            records.extend(self.store.list_failed(kind).await?);
        }
        Ok(records)
    }

    pub async fn get(&self, kind: EntityKind, id: MutationId) -> Result<PendingMutation, AppError> {
        self.store
            .get(kind, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{kind} outbox record {id}")))
    }

    /// Puts a FAILED record back in line. It keeps its original position.
    pub async fn retry(&self, kind: EntityKind, id: MutationId) -> Result<(), AppError> {
        let record = self.get(kind, id).await?;
        if !record.is_failed() {
            return Err(AppError::InvalidInput(format!(
                "Only failed records can be retried; {kind} {id} is {}",
                record.status
            )));
        }

        self.store.mark_pending(kind, id).await?;
        tracing::info!(target: "outbox::store", kind = %kind, id = id.value(), "failed record re-queued");
        Ok(())
    }

    /// Drops a FAILED record for good.
    pub async fn discard(&self, kind: EntityKind, id: MutationId) -> Result<(), AppError> {
        let record = self.get(kind, id).await?;
        if !record.is_failed() {
            return Err(AppError::InvalidInput(format!(
                "Only failed records can be discarded; {kind} {id} is {}",
                record.status
            )));
        }

        self.store.remove(kind, id).await?;
        tracing::info!(target: "outbox::store", kind = %kind, id = id.value(), "failed record discarded");
        Ok(())
    }

    pub async fn count(&self, kind: Option<EntityKind>) -> Result<u64, AppError> {
        self.store.count(kind).await
    }

    pub async fn recover_in_flight(&self) -> Result<u64, AppError> {
        self.store.recover_in_flight().await
    }
}

fn kinds(kind: Option<EntityKind>) -> Vec<EntityKind> {
    match kind {
        Some(kind) => vec![kind],
        None => EntityKind::ALL.to_vec(),
    }
}
