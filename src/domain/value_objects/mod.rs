pub mod outbox;

pub use outbox::{EntityKind, IdempotencyKey, MutationId, MutationStatus, RemoteId};
