pub mod entity_kind;
pub mod idempotency_key;
pub mod mutation_id;
pub mod mutation_status;
pub mod remote_id;

pub use entity_kind::EntityKind;
pub use idempotency_key::IdempotencyKey;
pub use mutation_id::MutationId;
pub use mutation_status::MutationStatus;
pub use remote_id::RemoteId;
