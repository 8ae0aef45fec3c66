use async_trait::async_trait;

use crate::{EventEnvelope, EventStoreError, ExpectedVersion, NewEvent, Result, StreamName, Version};

/// Core trait for event log implementations.
///
/// An event store is responsible for persisting and retrieving events.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Retrieves every event of a stream.
    ///
    /// Events are returned in version order (oldest first). A stream with
    /// no history yields an empty vector.
    async fn read_stream(&self, stream: &StreamName) -> Result<Vec<EventEnvelope>>;

    /// Appends events to the end of a stream.
    ///
    /// The tail check and the write are one atomic step: if the stream's
    /// current tail does not satisfy `expected`, the call fails with
    /// `ConcurrencyConflict` and nothing is written. Versions are assigned
    /// contiguously after the current tail.
    ///
    /// Returns the version of the last appended event.
    async fn append(
        &self,
        stream: &StreamName,
        events: Vec<NewEvent>,
        expected: ExpectedVersion,
    ) -> Result<Version>;

    /// Gets the version of the last event in a stream.
    ///
    /// Returns None if the stream has no events.
    async fn stream_version(&self, stream: &StreamName) -> Result<Option<Version>>;
}

/// Extension trait providing convenience methods for event stores.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Appends a single event to a stream.
    async fn append_event(
        &self,
        stream: &StreamName,
        event: NewEvent,
        expected: ExpectedVersion,
    ) -> Result<Version> {
        self.append(stream, vec![event], expected).await
    }

    /// Checks if a stream exists (has any events).
    async fn stream_exists(&self, stream: &StreamName) -> Result<bool> {
        Ok(self.stream_version(stream).await?.is_some())
    }
}

// Blanket implementation for all EventStore implementations
impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Validates a batch before appending.
pub fn validate_events_for_append(events: &[NewEvent]) -> Result<()> {
    if events.is_empty() {
        return Err(EventStoreError::InvalidAppend(
            "Cannot append empty event list".to_string(),
        ));
    }

    if let Some(untyped) = events.iter().position(|e| e.event_type.is_empty()) {
        return Err(EventStoreError::InvalidAppend(format!(
            "Event at index {untyped} has no event type"
        )));
    }

    for (index, event) in events.iter().enumerate() {
        if events[..index].iter().any(|e| e.event_id == event.event_id) {
            return Err(EventStoreError::InvalidAppend(format!(
                "Duplicate event id {} in batch",
                event.event_id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(event_type: &str) -> NewEvent {
        NewEvent::builder()
            .event_type(event_type)
            .payload_raw(serde_json::json!({}))
            .build()
    }

    #[test]
    fn empty_batch_is_rejected() {
        let result = validate_events_for_append(&[]);
        assert!(matches!(result, Err(EventStoreError::InvalidAppend(_))));
    }

    #[test]
    fn untyped_event_is_rejected() {
        let result = validate_events_for_append(&[event("IssueOpened"), event("")]);
        match result {
            Err(EventStoreError::InvalidAppend(message)) => assert!(message.contains("index 1")),
            other => panic!("expected InvalidAppend, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_event_ids_are_rejected() {
        let first = event("IssueOpened");
        let duplicate = first.clone();
        let result = validate_events_for_append(&[first, duplicate]);
        assert!(matches!(result, Err(EventStoreError::InvalidAppend(_))));
    }

    #[test]
    fn well_formed_batch_passes() {
        let result = validate_events_for_append(&[event("IssueOpened"), event("IssueClosed")]);
        assert!(result.is_ok());
    }
}
