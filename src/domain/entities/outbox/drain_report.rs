use serde::{Deserialize, Serialize};

/// How a drain cycle ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CycleEnd {
    /// Every pending record was attempted.
    Exhausted,
    /// Connectivity was lost; untouched records stay PENDING for the next cycle.
    Aborted { reason: String },
    /// The local store failed mid-cycle.
    Errored { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    pub attempted: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub end: CycleEnd,
    pub duration_ms: u64,
}

impl DrainReport {
    pub fn new(attempted: u32, succeeded: u32, failed: u32, end: CycleEnd, duration_ms: u64) -> Self {
        Self {
            attempted,
            succeeded,
            failed,
            end,
            duration_ms,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.end, CycleEnd::Aborted { .. })
    }
}

/// Result of asking the orchestrator to drain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Another cycle was already running; nothing was done.
    Skipped,
    Completed(DrainReport),
}

impl DrainOutcome {
    pub fn report(&self) -> Option<&DrainReport> {
        match self {
            DrainOutcome::Skipped => None,
            DrainOutcome::Completed(report) => Some(report),
        }
    }
}
