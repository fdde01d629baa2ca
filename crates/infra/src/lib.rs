//! Infrastructure layer: stores, the transition executor, admission control,
//! side effects, and the service facade the request layer talks to.

pub mod admission;
pub mod event_store;
pub mod executor;
pub mod service;
pub mod side_effects;

#[cfg(test)]
mod integration_tests;

pub use admission::{AdmissionController, CreateApplication, InMemoryKycDirectory, KycDirectory};
pub use event_store::{
    ApplicationKey, EventStore, InMemoryEventStore, StoreError, StoredEvent, UncommittedEvent,
};
pub use executor::{ExecuteError, TransitionExecutor, TransitionRequest};
pub use service::PlatformService;
pub use side_effects::{
    InMemoryNotificationSink, Notification, NotificationSink, SideEffectDispatcher, SinkError,
    TemplateKind,
};
