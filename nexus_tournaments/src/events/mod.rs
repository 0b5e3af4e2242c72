//! Domain events and the hub that fans them out to observers.

pub mod hub;
pub mod messages;

pub use hub::{
    DEFAULT_EVENT_BUFFER_SIZE, EventHub, HubStats, ObserverHandle, ObserverId, PublishReport,
    Topic,
};
pub use messages::DomainEvent;
