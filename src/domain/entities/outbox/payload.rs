use crate::domain::value_objects::EntityKind;
use bytes::Bytes;

/// Binary attachment carried with a record. The bytes are opaque to the outbox.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentRef {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl AttachmentRef {
    pub fn new(file_name: String, content_type: Option<String>, bytes: Bytes) -> Self {
        Self {
            file_name,
            content_type,
            bytes,
        }
    }
}

/// Fields needed to recreate an expense create-request.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpensePayload {
    pub merchant: String,
    pub amount: f64,
    pub date: String,
    pub category: String,
    pub trip_id: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub attachment: Option<AttachmentRef>,
}

impl ExpensePayload {
    pub fn new(merchant: String, amount: f64, date: String, category: String) -> Self {
        Self {
            merchant,
            amount,
            date,
            category,
            trip_id: None,
            description: None,
            location: None,
            attachment: None,
        }
    }

    pub fn with_trip_id(mut self, trip_id: impl Into<String>) -> Self {
        self.trip_id = Some(trip_id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_attachment(mut self, attachment: AttachmentRef) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

/// Fields needed to recreate a trip create-request.
#[derive(Debug, Clone, PartialEq)]
pub struct TripPayload {
    pub name: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub destination: Option<String>,
    pub budget: Option<f64>,
    pub description: Option<String>,
}

impl TripPayload {
    pub fn new(name: String, start_date: String) -> Self {
        Self {
            name,
            start_date,
            end_date: None,
            destination: None,
            budget: None,
            description: None,
        }
    }

    pub fn with_end_date(mut self, end_date: impl Into<String>) -> Self {
        self.end_date = Some(end_date.into());
        self
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn with_budget(mut self, budget: f64) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationPayload {
    Expense(ExpensePayload),
    Trip(TripPayload),
}

impl MutationPayload {
    pub fn kind(&self) -> EntityKind {
        match self {
            MutationPayload::Expense(_) => EntityKind::Expense,
            MutationPayload::Trip(_) => EntityKind::Trip,
        }
    }

    pub fn attachment(&self) -> Option<&AttachmentRef> {
        match self {
            MutationPayload::Expense(expense) => expense.attachment.as_ref(),
            MutationPayload::Trip(_) => None,
        }
    }
}

impl From<ExpensePayload> for MutationPayload {
    fn from(payload: ExpensePayload) -> Self {
        MutationPayload::Expense(payload)
    }
}

impl From<TripPayload> for MutationPayload {
    fn from(payload: TripPayload) -> Self {
        MutationPayload::Trip(payload)
    }
}
