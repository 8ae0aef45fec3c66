use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    EventEnvelope, EventStoreError, ExpectedVersion, NewEvent, Result, StreamName, Version,
    store::{EventStore, validate_events_for_append},
};

/// In-memory event store implementation.
///
/// Streams live in a single map behind one lock; the tail check and the
/// write in `append` happen under the same write guard, which makes the
/// expected-version check atomic.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    streams: Arc<RwLock<HashMap<StreamName, Vec<EventEnvelope>>>>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored across all streams.
    pub async fn event_count(&self) -> usize {
        self.streams.read().await.values().map(Vec::len).sum()
    }

    /// Clears all streams.
    pub async fn clear(&self) {
        self.streams.write().await.clear();
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn read_stream(&self, stream: &StreamName) -> Result<Vec<EventEnvelope>> {
        let streams = self.streams.read().await;
        Ok(streams.get(stream).cloned().unwrap_or_default())
    }

    #[tracing::instrument(skip(self, events), fields(stream = %stream, count = events.len()))]
    async fn append(
        &self,
        stream: &StreamName,
        events: Vec<NewEvent>,
        expected: ExpectedVersion,
    ) -> Result<Version> {
        validate_events_for_append(&events)?;

        let mut streams = self.streams.write().await;
        let current = streams
            .get(stream)
            .and_then(|recorded| recorded.last())
            .map(|e| e.version);
        if !expected.matches(current) {
            tracing::debug!(%expected, ?current, "rejecting append");
            return Err(EventStoreError::ConcurrencyConflict {
                stream: stream.clone(),
                expected,
                actual: current,
            });
        }

        // Only an accepted append creates the stream.
        let recorded = streams.entry(stream.clone()).or_default();
        let mut version = current.map_or(Version::first(), |v| v.next());
        let mut last = version;
        for event in events {
            recorded.push(EventEnvelope::record(event, stream.clone(), version));
            last = version;
            version = version.next();
        }

        Ok(last)
    }

    async fn stream_version(&self, stream: &StreamName) -> Result<Option<Version>> {
        let streams = self.streams.read().await;
        Ok(streams
            .get(stream)
            .and_then(|events| events.last())
            .map(|e| e.version))
    }
}
