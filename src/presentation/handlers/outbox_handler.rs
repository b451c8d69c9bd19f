use crate::application::services::{
    MutationReplayer, OutboxService, StatusCallback, StatusReporter, SubscriptionId,
    SyncOrchestrator,
};
use crate::domain::entities::{
    AttachmentRef, ExpensePayload, MutationPayload, PendingMutation, TripPayload,
};
use crate::domain::value_objects::{EntityKind, MutationId};
use crate::infrastructure::outbox::metrics::{self, DrainMetricsSnapshot};
use crate::presentation::dto::Validate;
use crate::presentation::dto::outbox::{
    AttachmentDto, OutboxQuery, OutboxRecord, OutboxRecordRef, SaveExpenseRequest,
    SaveMutationRequest, SaveMutationResponse, SaveTripRequest, SyncResultResponse,
};
use crate::shared::AppError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde_json::Value;
use std::sync::Arc;

/// Consumer surface of the outbox.
pub struct OutboxHandler {
    outbox_service: Arc<OutboxService>,
    orchestrator: Arc<SyncOrchestrator>,
    reporter: Arc<StatusReporter>,
}

impl OutboxHandler {
    pub fn new(
        outbox_service: Arc<OutboxService>,
        orchestrator: Arc<SyncOrchestrator>,
        reporter: Arc<StatusReporter>,
    ) -> Self {
        Self {
            outbox_service,
            orchestrator,
            reporter,
        }
    }

    pub async fn save_mutation_offline(
        &self,
        request: SaveMutationRequest,
    ) -> Result<SaveMutationResponse, AppError> {
        request.validate().map_err(AppError::ValidationError)?;

        let payload = match request {
            SaveMutationRequest::Expense(expense) => expense_payload(expense)?,
            SaveMutationRequest::Trip(trip) => trip_payload(trip),
        };
        let kind = payload.kind();
        let id = self.outbox_service.save_mutation_offline(payload).await?;

        Ok(SaveMutationResponse {
            kind: kind.to_string(),
            id: id.value(),
        })
    }

    pub async fn trigger_sync(&self) -> SyncResultResponse {
        self.orchestrator.trigger_sync().await.into()
    }

    pub fn subscribe(&self, callback: StatusCallback) -> SubscriptionId {
        self.reporter.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.reporter.unsubscribe(id)
    }

    pub async fn list_pending(&self, query: OutboxQuery) -> Result<Vec<OutboxRecord>, AppError> {
        query.validate().map_err(AppError::ValidationError)?;
        let records = self
            .outbox_service
            .list_pending(parse_optional_kind(query.kind.as_deref())?)
            .await?;
        Ok(records.iter().map(map_record).collect())
    }

    pub async fn list_failed(&self, query: OutboxQuery) -> Result<Vec<OutboxRecord>, AppError> {
        query.validate().map_err(AppError::ValidationError)?;
        let records = self
            .outbox_service
            .list_failed(parse_optional_kind(query.kind.as_deref())?)
            .await?;
        Ok(records.iter().map(map_record).collect())
    }

    pub async fn retry_mutation(&self, reference: OutboxRecordRef) -> Result<(), AppError> {
        let (kind, id) = parse_reference(&reference)?;
        self.outbox_service.retry(kind, id).await
    }

    pub async fn discard_mutation(&self, reference: OutboxRecordRef) -> Result<(), AppError> {
        let (kind, id) = parse_reference(&reference)?;
        self.outbox_service.discard(kind, id).await
    }

    pub async fn count(&self, query: OutboxQuery) -> Result<u64, AppError> {
        query.validate().map_err(AppError::ValidationError)?;
        self.outbox_service
            .count(parse_optional_kind(query.kind.as_deref())?)
            .await
    }

    pub fn sync_metrics(&self) -> DrainMetricsSnapshot {
        metrics::snapshot()
    }
}

fn expense_payload(request: SaveExpenseRequest) -> Result<MutationPayload, AppError> {
    let attachment = request.attachment.map(decode_attachment).transpose()?;
    Ok(MutationPayload::Expense(ExpensePayload {
        merchant: request.merchant,
        amount: request.amount,
        date: request.date,
        category: request.category,
        trip_id: request.trip_id,
        description: request.description,
        location: request.location,
        attachment,
    }))
}

fn trip_payload(request: SaveTripRequest) -> MutationPayload {
    MutationPayload::Trip(TripPayload {
        name: request.name,
        start_date: request.start_date,
        end_date: request.end_date,
        destination: request.destination,
        budget: request.budget,
        description: request.description,
    })
}

fn decode_attachment(dto: AttachmentDto) -> Result<AttachmentRef, AppError> {
    let bytes = STANDARD
        .decode(dto.data.as_bytes())
        .map_err(|err| AppError::ValidationError(format!("Attachment is not valid base64: {err}")))?;
    Ok(AttachmentRef::new(
        dto.file_name,
        dto.content_type,
        Bytes::from(bytes),
    ))
}

fn parse_kind(value: &str) -> Result<EntityKind, AppError> {
    value.parse().map_err(AppError::ValidationError)
}

fn parse_optional_kind(value: Option<&str>) -> Result<Option<EntityKind>, AppError> {
    value.map(parse_kind).transpose()
}

fn parse_reference(reference: &OutboxRecordRef) -> Result<(EntityKind, MutationId), AppError> {
    reference.validate().map_err(AppError::ValidationError)?;
    let kind = parse_kind(&reference.kind)?;
    let id = MutationId::new(reference.id).map_err(AppError::ValidationError)?;
    Ok((kind, id))
}

fn map_record(record: &PendingMutation) -> OutboxRecord {
    let mut fields = MutationReplayer::build_request(record).fields;
    fields.remove("idempotencyKey");

    OutboxRecord {
        id: record.id.value(),
        kind: record.kind().to_string(),
        status: record.status.to_string(),
        idempotency_key: record.idempotency_key.to_string(),
        fields: Value::Object(fields),
        has_attachment: record.payload.attachment().is_some(),
        created_at: record.created_at.timestamp_millis(),
        last_error: record.last_error.clone(),
    }
}
