mod mappers;
pub mod metrics;
mod rows;
pub mod sqlite_store;

pub use sqlite_store::SqliteOutboxStore;
