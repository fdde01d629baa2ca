//! `internlink-events` — event mechanics shared by the lifecycle core.
//!
//! Events are how the state machine makes committed transitions visible to the
//! rest of the platform (notifications, audit, websocket fan-out). Delivery is
//! an external concern; this crate only provides the trait, the envelope, and
//! a pub/sub seam.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod handler;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use handler::execute;
pub use in_memory_bus::InMemoryEventBus;
