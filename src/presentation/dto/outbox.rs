use crate::domain::entities::{CycleEnd, DrainOutcome};
use crate::presentation::dto::Validate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 10 MiB once decoded; base64 inflates by 4/3.
const MAX_ATTACHMENT_BASE64_LEN: usize = 10 * 1024 * 1024 / 3 * 4 + 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentDto {
    pub file_name: String,
    pub content_type: Option<String>,
    /// Standard base64 of the raw bytes.
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveExpenseRequest {
    pub merchant: String,
    pub amount: f64,
    pub date: String,
    pub category: String,
    pub trip_id: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub attachment: Option<AttachmentDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveTripRequest {
    pub name: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub destination: Option<String>,
    pub budget: Option<f64>,
    pub description: Option<String>,
}

/// `{ "kind": "EXPENSE", "data": { ... } }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaveMutationRequest {
    Expense(SaveExpenseRequest),
    Trip(SaveTripRequest),
}

impl Validate for SaveMutationRequest {
    fn validate(&self) -> Result<(), String> {
        match self {
            SaveMutationRequest::Expense(expense) => {
                if !expense.amount.is_finite() {
                    return Err("Amount must be a finite number".to_string());
                }
                if let Some(attachment) = &expense.attachment {
                    if attachment.file_name.trim().is_empty() {
                        return Err("Attachment file name is required".to_string());
                    }
                    if attachment.data.len() > MAX_ATTACHMENT_BASE64_LEN {
                        return Err("Attachment is too large (max 10MB)".to_string());
                    }
                }
                Ok(())
            }
            SaveMutationRequest::Trip(trip) => {
                if let Some(budget) = trip.budget
                    && !budget.is_finite()
                {
                    return Err("Budget must be a finite number".to_string());
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveMutationResponse {
    pub kind: String,
    pub id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxQuery {
    pub kind: Option<String>,
}

impl Validate for OutboxQuery {
    fn validate(&self) -> Result<(), String> {
        if let Some(kind) = &self.kind
            && kind.trim().is_empty()
        {
            return Err("Kind must not be blank".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxRecordRef {
    pub kind: String,
    pub id: i64,
}

impl Validate for OutboxRecordRef {
    fn validate(&self) -> Result<(), String> {
        if self.kind.trim().is_empty() {
            return Err("Kind is required".to_string());
        }
        if self.id <= 0 {
            return Err("Record id must be positive".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxRecord {
    pub id: i64,
    pub kind: String,
    pub status: String,
    pub idempotency_key: String,
    pub fields: Value,
    pub has_attachment: bool,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResultResponse {
    pub skipped: bool,
    pub attempted: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub aborted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub duration_ms: u64,
}

impl From<DrainOutcome> for SyncResultResponse {
    fn from(outcome: DrainOutcome) -> Self {
        match outcome {
            DrainOutcome::Skipped => Self {
                skipped: true,
                attempted: 0,
                succeeded: 0,
                failed: 0,
                aborted: false,
                message: None,
                duration_ms: 0,
            },
            DrainOutcome::Completed(report) => {
                let aborted = report.is_aborted();
                let message = match report.end {
                    CycleEnd::Exhausted => None,
                    CycleEnd::Aborted { reason } => Some(reason),
                    CycleEnd::Errored { message } => Some(message),
                };
                Self {
                    skipped: false,
                    attempted: report.attempted,
                    succeeded: report.succeeded,
                    failed: report.failed,
                    aborted,
                    message,
                    duration_ms: report.duration_ms,
                }
            }
        }
    }
}
