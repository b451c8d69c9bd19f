pub mod connectivity_monitor;
pub mod mutation_replayer;
pub mod outbox_service;
pub mod status_reporter;
pub mod sync_orchestrator;

pub use connectivity_monitor::{ConnectivityMonitor, ConnectivityTransition};
pub use mutation_replayer::MutationReplayer;
pub use outbox_service::OutboxService;
pub use status_reporter::{
    NotificationLevel, StatusCallback, StatusNotification, StatusReporter, SubscriptionId,
};
pub use sync_orchestrator::SyncOrchestrator;
