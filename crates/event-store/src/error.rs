use thiserror::Error;

use crate::{ExpectedVersion, StreamName, Version};

/// Errors that can occur when interacting with the event store.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// A concurrency conflict occurred when appending events.
    /// The stream tail did not match the expected version.
    #[error(
        "Concurrency conflict on stream {stream}: expected version {expected}, found {}",
        display_tail(.actual)
    )]
    ConcurrencyConflict {
        stream: StreamName,
        expected: ExpectedVersion,
        actual: Option<Version>,
    },

    /// The batch handed to `append` was rejected before touching the stream.
    #[error("Invalid append: {0}")]
    InvalidAppend(String),

    /// The backing log could not be reached or did not answer in time.
    #[error("Event log unavailable: {0}")]
    Unavailable(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn display_tail(actual: &Option<Version>) -> String {
    match actual {
        Some(version) => version.to_string(),
        None => "no stream".to_string(),
    }
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;
