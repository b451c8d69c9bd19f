use super::rows::{ExpenseOutboxRow, TripOutboxRow};
use crate::domain::entities::{
    AttachmentRef, ExpensePayload, MutationPayload, PendingMutation, TripPayload,
};
use crate::domain::value_objects::{EntityKind, IdempotencyKey, MutationId, MutationStatus};
use crate::shared::error::AppError;
use bytes::Bytes;
use chrono::{DateTime, Utc};

pub fn table_name(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Expense => "expense_outbox",
        EntityKind::Trip => "trip_outbox",
    }
}

pub fn domain_mutation_from_expense_row(row: ExpenseOutboxRow) -> Result<PendingMutation, AppError> {
    let attachment = match (row.attachment_name, row.attachment_bytes) {
        (Some(name), Some(bytes)) => Some(AttachmentRef::new(
            name,
            row.attachment_type,
            Bytes::from(bytes),
        )),
        (None, None) => None,
        _ => {
            return Err(AppError::DeserializationError(format!(
                "expense_outbox row {} has a partial attachment",
                row.id
            )));
        }
    };

    let payload = ExpensePayload {
        merchant: row.merchant,
        amount: row.amount,
        date: row.date,
        category: row.category,
        trip_id: row.trip_id,
        description: row.description,
        location: row.location,
        attachment,
    };

    build_mutation(
        row.id,
        &row.idempotency_key,
        MutationPayload::Expense(payload),
        &row.status,
        row.created_at,
        row.last_error,
    )
}

pub fn domain_mutation_from_trip_row(row: TripOutboxRow) -> Result<PendingMutation, AppError> {
    let payload = TripPayload {
        name: row.name,
        start_date: row.start_date,
        end_date: row.end_date,
        destination: row.destination,
        budget: row.budget,
        description: row.description,
    };

    build_mutation(
        row.id,
        &row.idempotency_key,
        MutationPayload::Trip(payload),
        &row.status,
        row.created_at,
        row.last_error,
    )
}

fn build_mutation(
    id: i64,
    idempotency_key: &str,
    payload: MutationPayload,
    status: &str,
    created_at: i64,
    last_error: Option<String>,
) -> Result<PendingMutation, AppError> {
    let id = MutationId::new(id).map_err(AppError::DeserializationError)?;
    let idempotency_key =
        IdempotencyKey::parse(idempotency_key).map_err(AppError::DeserializationError)?;
    let status = MutationStatus::try_from(status).map_err(AppError::DeserializationError)?;
    let last_error = match status {
        MutationStatus::Failed => last_error,
        _ => None,
    };

    Ok(PendingMutation::new(
        id,
        idempotency_key,
        payload,
        status,
        timestamp_to_datetime(created_at),
        last_error,
    ))
}

pub fn timestamp_to_datetime(ts_millis: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ts_millis).unwrap_or_else(Utc::now)
}
