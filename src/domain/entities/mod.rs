pub mod outbox;

pub use outbox::{
    AttachmentRef, CycleEnd, DrainOutcome, DrainReport, ExpensePayload, MutationDraft,
    MutationPayload, PendingMutation, TripPayload,
};
