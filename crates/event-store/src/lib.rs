pub mod error;
pub mod event;
pub mod memory;
pub mod store;

pub use common::{AggregateId, StreamName};
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventId, ExpectedVersion, NewEvent, NewEventBuilder, Version};
pub use memory::InMemoryEventStore;
pub use store::{EventStore, EventStoreExt};
