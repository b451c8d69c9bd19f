pub mod connectivity;
pub mod mutation_gateway;
pub mod outbox_store;
pub mod sync_event_sink;

pub use connectivity::ConnectivitySource;
pub use mutation_gateway::{DomainMutationGateway, RemoteError, RemoteMutationRequest};
pub use outbox_store::OutboxStore;
pub use sync_event_sink::{SyncEvent, SyncEventSink};
