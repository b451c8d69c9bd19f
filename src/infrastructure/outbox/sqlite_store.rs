use super::mappers::{
    domain_mutation_from_expense_row, domain_mutation_from_trip_row, table_name,
};
use super::rows::{ExpenseOutboxRow, TripOutboxRow};
use crate::application::ports::outbox_store::OutboxStore;
use crate::domain::entities::{MutationDraft, MutationPayload, PendingMutation};
use crate::domain::value_objects::{EntityKind, MutationId, MutationStatus};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Sqlite};

const DRAINABLE_FILTER: &str = "status IN ('pending', 'syncing')";
const FAILED_FILTER: &str = "status = 'failed'";
const BY_ID_FILTER: &str = "id = ?1";

/// SQLite-backed outbox with one table per entity kind.
pub struct SqliteOutboxStore {
    pool: Pool<Sqlite>,
}

impl SqliteOutboxStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    async fn fetch(
        &self,
        kind: EntityKind,
        filter: &str,
        id: Option<MutationId>,
    ) -> Result<Vec<PendingMutation>, AppError> {
        // AUTOINCREMENT ids follow call order even when the wall clock steps backwards.
        let sql = format!(
            "SELECT * FROM {} WHERE {filter} ORDER BY id ASC",
            table_name(kind)
        );

        match kind {
            EntityKind::Expense => {
                let mut query = sqlx::query_as::<_, ExpenseOutboxRow>(&sql);
                if let Some(id) = id {
                    query = query.bind(id.value());
                }
                query
                    .fetch_all(&self.pool)
                    .await?
                    .into_iter()
                    .map(domain_mutation_from_expense_row)
                    .collect()
            }
            EntityKind::Trip => {
                let mut query = sqlx::query_as::<_, TripOutboxRow>(&sql);
                if let Some(id) = id {
                    query = query.bind(id.value());
                }
                query
                    .fetch_all(&self.pool)
                    .await?
                    .into_iter()
                    .map(domain_mutation_from_trip_row)
                    .collect()
            }
        }
    }

    async fn transition(
        &self,
        kind: EntityKind,
        id: MutationId,
        status: MutationStatus,
        error: Option<&str>,
    ) -> Result<(), AppError> {
        let sql = format!(
            "UPDATE {} SET status = ?1, last_error = ?2 WHERE id = ?3",
            table_name(kind)
        );
        let result = sqlx::query(&sql)
            .bind(status.as_str())
            .bind(error)
            .bind(id.value())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(kind, id));
        }

        tracing::debug!(
            target: "outbox::store",
            kind = %kind,
            id = id.value(),
            status = status.as_str(),
            "outbox record transitioned"
        );
        Ok(())
    }
}

#[async_trait]
impl OutboxStore for SqliteOutboxStore {
    async fn enqueue(&self, draft: MutationDraft) -> Result<MutationId, AppError> {
        let created_at = Utc::now().timestamp_millis();
        let kind = draft.kind();
        let key = draft.idempotency_key.as_str().to_string();

        let result = match draft.payload {
            MutationPayload::Expense(expense) => {
                let (attachment_name, attachment_type, attachment_bytes) = match expense.attachment
                {
                    Some(attachment) => (
                        Some(attachment.file_name),
                        attachment.content_type,
                        Some(attachment.bytes.to_vec()),
                    ),
                    None => (None, None, None),
                };

                sqlx::query(
                    r#"
                    INSERT INTO expense_outbox (
                        idempotency_key, merchant, amount, date, category,
                        trip_id, description, location,
                        attachment_name, attachment_type, attachment_bytes,
                        status, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 'pending', ?12)
                    "#,
                )
                .bind(&key)
                .bind(&expense.merchant)
                .bind(expense.amount)
                .bind(&expense.date)
                .bind(&expense.category)
                .bind(&expense.trip_id)
                .bind(&expense.description)
                .bind(&expense.location)
                .bind(attachment_name)
                .bind(attachment_type)
                .bind(attachment_bytes)
                .bind(created_at)
                .execute(&self.pool)
                .await
            }
            MutationPayload::Trip(trip) => {
                sqlx::query(
                    r#"
                    INSERT INTO trip_outbox (
                        idempotency_key, name, start_date, end_date,
                        destination, budget, description,
                        status, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending', ?8)
                    "#,
                )
                .bind(&key)
                .bind(&trip.name)
                .bind(&trip.start_date)
                .bind(&trip.end_date)
                .bind(&trip.destination)
                .bind(trip.budget)
                .bind(&trip.description)
                .bind(created_at)
                .execute(&self.pool)
                .await
            }
        };

        let result = result.map_err(|err| {
            tracing::error!(
                target: "outbox::store",
                kind = %kind,
                error = %err,
                "failed to persist outbox record"
            );
            AppError::Storage(err.to_string())
        })?;

        let id = MutationId::new(result.last_insert_rowid()).map_err(AppError::Storage)?;
        tracing::debug!(target: "outbox::store", kind = %kind, id = id.value(), "outbox record queued");
        Ok(id)
    }

    async fn list_pending(&self, kind: EntityKind) -> Result<Vec<PendingMutation>, AppError> {
        self.fetch(kind, DRAINABLE_FILTER, None).await
    }

    async fn list_failed(&self, kind: EntityKind) -> Result<Vec<PendingMutation>, AppError> {
        self.fetch(kind, FAILED_FILTER, None).await
    }

    async fn get(
        &self,
        kind: EntityKind,
        id: MutationId,
    ) -> Result<Option<PendingMutation>, AppError> {
        Ok(self.fetch(kind, BY_ID_FILTER, Some(id)).await?.into_iter().next())
    }

    async fn mark_syncing(&self, kind: EntityKind, id: MutationId) -> Result<(), AppError> {
        self.transition(kind, id, MutationStatus::Syncing, None).await
    }

    async fn mark_pending(&self, kind: EntityKind, id: MutationId) -> Result<(), AppError> {
        self.transition(kind, id, MutationStatus::Pending, None).await
    }

    async fn mark_failed(
        &self,
        kind: EntityKind,
        id: MutationId,
        error: &str,
    ) -> Result<(), AppError> {
        self.transition(kind, id, MutationStatus::Failed, Some(error))
            .await
    }

    async fn remove(&self, kind: EntityKind, id: MutationId) -> Result<(), AppError> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", table_name(kind));
        let result = sqlx::query(&sql)
            .bind(id.value())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(kind, id));
        }
        Ok(())
    }

    async fn count(&self, kind: Option<EntityKind>) -> Result<u64, AppError> {
        let kinds: Vec<EntityKind> = match kind {
            Some(kind) => vec![kind],
            None => EntityKind::ALL.to_vec(),
        };

        let mut total = 0u64;
        for kind in kinds {
            let sql = format!("SELECT COUNT(*) FROM {}", table_name(kind));
            let (count,): (i64,) = sqlx::query_as(&sql).fetch_one(&self.pool).await?;
            total += u64::try_from(count)
                .map_err(|_| AppError::Internal("Outbox count cannot be negative".to_string()))?;
        }
        Ok(total)
    }

    async fn recover_in_flight(&self) -> Result<u64, AppError> {
        let mut recovered = 0u64;
        for kind in EntityKind::ALL {
            let sql = format!(
                "UPDATE {} SET status = 'pending', last_error = NULL WHERE status = 'syncing'",
                table_name(kind)
            );
            let result = sqlx::query(&sql).execute(&self.pool).await?;
            recovered += result.rows_affected();
        }

        if recovered > 0 {
            tracing::info!(
                target: "outbox::store",
                recovered,
                "reset interrupted outbox records to pending"
            );
        }
        Ok(recovered)
    }
}

fn not_found(kind: EntityKind, id: MutationId) -> AppError {
    AppError::NotFound(format!("{kind} outbox record {id}"))
}
