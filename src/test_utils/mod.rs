/// In-memory store that records primitive calls
pub mod memory;

/// Helpers for tests against a real `MongoDB` server
pub mod mongo;

pub use memory::{MemoryStore, StoreCall};
pub use mongo::{live_config, unique_collection_name};
