pub mod outbox_handler;

pub use outbox_handler::OutboxHandler;
