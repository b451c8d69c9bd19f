use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Closed set of record kinds the outbox can carry. Each kind has its own table and endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Expense,
    Trip,
}

impl EntityKind {
    /// Drain order across kinds.
    pub const ALL: [EntityKind; 2] = [EntityKind::Expense, EntityKind::Trip];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Expense => "EXPENSE",
            EntityKind::Trip => "TRIP",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EXPENSE" => Ok(EntityKind::Expense),
            "TRIP" => Ok(EntityKind::Trip),
            other => Err(format!("Unknown entity kind: {other}")),
        }
    }
}
