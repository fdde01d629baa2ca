//! Append-only event storage for application and posting streams.

mod in_memory;
mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{ApplicationKey, EventStore, StoreError, StoredEvent, UncommittedEvent};
