use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct ExpenseOutboxRow {
    pub id: i64,
    pub idempotency_key: String,
    pub merchant: String,
    pub amount: f64,
    pub date: String,
    pub category: String,
    pub trip_id: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub attachment_name: Option<String>,
    pub attachment_type: Option<String>,
    pub attachment_bytes: Option<Vec<u8>>,
    pub status: String,
    pub created_at: i64,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct TripOutboxRow {
    pub id: i64,
    pub idempotency_key: String,
    pub name: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub destination: Option<String>,
    pub budget: Option<f64>,
    pub description: Option<String>,
    pub status: String,
    pub created_at: i64,
    pub last_error: Option<String>,
}
