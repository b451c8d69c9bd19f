pub mod entities;
pub mod value_objects;

pub use entities::{MutationPayload, PendingMutation};
pub use value_objects::{EntityKind, MutationId, MutationStatus};
