pub mod connectivity;
pub mod database;
pub mod outbox;
pub mod remote;

pub use connectivity::PlatformConnectivitySource;
pub use database::ConnectionPool;
pub use outbox::SqliteOutboxStore;
pub use remote::HttpMutationGateway;
