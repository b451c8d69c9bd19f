pub mod drain_report;
pub mod payload;
pub mod pending_mutation;

pub use drain_report::{CycleEnd, DrainOutcome, DrainReport};
pub use payload::{AttachmentRef, ExpensePayload, MutationPayload, TripPayload};
pub use pending_mutation::{MutationDraft, PendingMutation};
