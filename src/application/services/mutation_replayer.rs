use crate::application::ports::mutation_gateway::{
    DomainMutationGateway, RemoteError, RemoteMutationRequest,
};
use crate::domain::entities::{ExpensePayload, MutationPayload, PendingMutation, TripPayload};
use crate::domain::value_objects::RemoteId;
use serde_json::{Map, Value};
use std::sync::Arc;

const IDEMPOTENCY_FIELD: &str = "idempotencyKey";

/// Rebuilds create-requests from queued records and submits them. Never touches the outbox.
pub struct MutationReplayer {
    gateway: Arc<dyn DomainMutationGateway>,
}

impl MutationReplayer {
    pub fn new(gateway: Arc<dyn DomainMutationGateway>) -> Self {
        Self { gateway }
    }

    pub async fn replay(&self, mutation: &PendingMutation) -> Result<RemoteId, RemoteError> {
        let request = Self::build_request(mutation);
        let kind = request.kind;

        match self.gateway.submit(request).await {
            Ok(remote_id) => {
                tracing::debug!(
                    target: "outbox::replayer",
                    kind = %kind,
                    id = mutation.id.value(),
                    remote_id = %remote_id,
                    "mutation accepted by server"
                );
                Ok(remote_id)
            }
            Err(err) => {
                tracing::debug!(
                    target: "outbox::replayer",
                    kind = %kind,
                    id = mutation.id.value(),
                    transport = err.is_transport(),
                    error = %err,
                    "mutation replay failed"
                );
                Err(err)
            }
        }
    }

    pub fn build_request(mutation: &PendingMutation) -> RemoteMutationRequest {
        let mut fields = match &mutation.payload {
            MutationPayload::Expense(expense) => expense_fields(expense),
            MutationPayload::Trip(trip) => trip_fields(trip),
        };
        fields.insert(
            IDEMPOTENCY_FIELD.to_string(),
            Value::String(mutation.idempotency_key.as_str().to_string()),
        );

        RemoteMutationRequest {
            kind: mutation.kind(),
            idempotency_key: mutation.idempotency_key.clone(),
            fields,
            attachment: mutation.payload.attachment().cloned(),
        }
    }
}

fn expense_fields(expense: &ExpensePayload) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("merchant".into(), Value::from(expense.merchant.as_str()));
    fields.insert("amount".into(), Value::from(expense.amount));
    fields.insert("date".into(), Value::from(expense.date.as_str()));
    fields.insert("category".into(), Value::from(expense.category.as_str()));
    insert_optional(&mut fields, "tripId", expense.trip_id.as_deref());
    insert_optional(&mut fields, "description", expense.description.as_deref());
    insert_optional(&mut fields, "location", expense.location.as_deref());
    fields
}

fn trip_fields(trip: &TripPayload) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("name".into(), Value::from(trip.name.as_str()));
    fields.insert("startDate".into(), Value::from(trip.start_date.as_str()));
    insert_optional(&mut fields, "endDate", trip.end_date.as_deref());
    insert_optional(&mut fields, "destination", trip.destination.as_deref());
    if let Some(budget) = trip.budget {
        fields.insert("budget".into(), Value::from(budget));
    }
    insert_optional(&mut fields, "description", trip.description.as_deref());
    fields
}

fn insert_optional(fields: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        fields.insert(key.to_string(), Value::from(value));
    }
}
