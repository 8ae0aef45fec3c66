//! Identifier types shared by the event store and the domain.

mod types;

pub use types::{AggregateId, StreamName};
