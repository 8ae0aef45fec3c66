//! Command handling infrastructure.

use std::marker::PhantomData;
use std::str::FromStr;

use common::AggregateId;
use event_store::{EventEnvelope, EventStore, ExpectedVersion, NewEvent, StreamName, Version};
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::HandlerError;

/// What replay does with an event type the aggregate does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayPolicy {
    /// Treat the stream as corrupt.
    #[default]
    Reject,

    /// Log and ignore the event. It still counts toward the stream version.
    Skip,
}

impl FromStr for ReplayPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(ReplayPolicy::Reject),
            "skip" => Ok(ReplayPolicy::Skip),
            other => Err(format!("unknown replay policy: {other}")),
        }
    }
}

/// An aggregate rebuilt from its stream.
#[derive(Debug, Clone)]
pub struct Loaded<A: Aggregate> {
    /// The stream the state was read from.
    pub stream: StreamName,

    /// State after folding every recorded event.
    pub state: A,

    /// Version of the last event read; None if the stream has no history.
    pub version: Option<Version>,
}

impl<A: Aggregate> Loaded<A> {
    /// Returns true if at least one event was read.
    pub fn exists(&self) -> bool {
        self.version.is_some()
    }
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new event.
    pub state: A,

    /// The event that was persisted.
    pub event: A::Event,

    /// The version the event was recorded at.
    pub version: Version,
}

/// Handler for executing commands against aggregates.
///
/// Each call:
/// 1. Reads the aggregate's stream and folds it into the current state
/// 2. Applies the candidate event to that state, rejecting illegal transitions
/// 3. Appends the event, guarded by the version observed in step 1
///
/// Nothing is written unless step 3 is reached. Conflicts are reported, never
/// retried here.
pub struct CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    replay_policy: ReplayPolicy,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    /// Creates a new command handler with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            replay_policy: ReplayPolicy::default(),
            _phantom: PhantomData,
        }
    }

    /// Sets how replay treats unknown event types.
    pub fn with_replay_policy(mut self, policy: ReplayPolicy) -> Self {
        self.replay_policy = policy;
        self
    }

    /// Returns a reference to the underlying event store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn replay_policy(&self) -> ReplayPolicy {
        self.replay_policy
    }

    /// Derives the stream name for an aggregate instance.
    pub fn stream_name(aggregate_id: &AggregateId) -> StreamName {
        StreamName::for_aggregate(A::aggregate_type(), aggregate_id)
    }

    /// Loads an aggregate by replaying its stream.
    ///
    /// A missing stream yields the default state and no version.
    pub async fn load(&self, aggregate_id: &AggregateId) -> Result<Loaded<A>, HandlerError> {
        let stream = Self::stream_name(aggregate_id);
        let envelopes = self.store.read_stream(&stream).await?;

        let mut state = A::default();
        let mut version: Option<Version> = None;

        for envelope in &envelopes {
            let expected = version.map_or(Version::first(), |v| v.next());
            if envelope.version != expected {
                return Err(corrupt(
                    &stream,
                    envelope.version,
                    format!("expected version {expected}, found {}", envelope.version),
                ));
            }

            if let Some(event) = self.decode(&stream, envelope)? {
                state = state
                    .apply(&event)
                    .map_err(|e| corrupt(&stream, envelope.version, e.to_string()))?;
            }
            version = Some(envelope.version);
        }

        Ok(Loaded {
            stream,
            state,
            version,
        })
    }

    /// Validates `event` against the current state and appends it.
    ///
    /// The append expects the stream to still be at the version that was
    /// read; if another writer got there first the result is
    /// `ConcurrencyConflict` and the caller decides whether to try again.
    #[tracing::instrument(
        skip(self, event),
        fields(aggregate = A::aggregate_type(), event_type = event.event_type())
    )]
    pub async fn execute(
        &self,
        aggregate_id: &AggregateId,
        event: A::Event,
    ) -> Result<CommandResult<A>, HandlerError> {
        let loaded = self.load(aggregate_id).await?;

        let state = match loaded.state.apply(&event) {
            Ok(state) => state,
            Err(rejected) => {
                tracing::debug!(%rejected, "command rejected");
                metrics::counter!(
                    "commands_rejected_total",
                    "aggregate" => A::aggregate_type(),
                    "reason" => "invalid_transition"
                )
                .increment(1);
                return Err(rejected.into());
            }
        };

        let expected = ExpectedVersion::from_last_read(loaded.version);
        let new_event = encode(&event)?;

        let version = match self
            .store
            .append(&loaded.stream, vec![new_event], expected)
            .await
        {
            Ok(version) => version,
            Err(err) => {
                let err = HandlerError::from(err);
                if matches!(err, HandlerError::ConcurrencyConflict { .. }) {
                    tracing::warn!(stream = %loaded.stream, %expected, "concurrency conflict");
                    metrics::counter!(
                        "concurrency_conflicts_total",
                        "aggregate" => A::aggregate_type()
                    )
                    .increment(1);
                }
                return Err(err);
            }
        };

        metrics::counter!("commands_handled_total", "aggregate" => A::aggregate_type())
            .increment(1);
        tracing::debug!(stream = %loaded.stream, %version, "event appended");

        Ok(CommandResult {
            state,
            event,
            version,
        })
    }

    fn decode(
        &self,
        stream: &StreamName,
        envelope: &EventEnvelope,
    ) -> Result<Option<A::Event>, HandlerError> {
        if !A::Event::is_known_type(&envelope.event_type) {
            return match self.replay_policy {
                ReplayPolicy::Reject => Err(corrupt(
                    stream,
                    envelope.version,
                    format!("unknown event type {}", envelope.event_type),
                )),
                ReplayPolicy::Skip => {
                    tracing::warn!(
                        %stream,
                        version = %envelope.version,
                        event_type = %envelope.event_type,
                        "skipping unknown event type during replay"
                    );
                    Ok(None)
                }
            };
        }

        let event: A::Event = serde_json::from_value(envelope.payload.clone()).map_err(|e| {
            corrupt(
                stream,
                envelope.version,
                format!("undecodable {} payload: {e}", envelope.event_type),
            )
        })?;

        if event.event_type() != envelope.event_type {
            return Err(corrupt(
                stream,
                envelope.version,
                format!(
                    "envelope type {} does not match payload type {}",
                    envelope.event_type,
                    event.event_type()
                ),
            ));
        }

        if let Some(owner) = event
            .aggregate_id()
            .filter(|owner| stream.aggregate_id().as_ref() != Some(*owner))
        {
            return Err(corrupt(
                stream,
                envelope.version,
                format!("event belongs to {owner}, not to stream {stream}"),
            ));
        }

        Ok(Some(event))
    }
}

fn encode<E: DomainEvent>(event: &E) -> Result<NewEvent, HandlerError> {
    Ok(NewEvent::builder()
        .event_type(event.event_type())
        .payload(event)?
        .build())
}

fn corrupt(stream: &StreamName, version: Version, reason: String) -> HandlerError {
    tracing::error!(%stream, %version, %reason, "corrupt history");
    HandlerError::CorruptHistory {
        stream: stream.clone(),
        version,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::InvalidTransition;
    use event_store::{EventStoreExt, InMemoryEventStore};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(tag = "type", content = "data")]
    enum CounterEvent {
        Incremented { by: u32 },
        Frozen,
    }

    impl DomainEvent for CounterEvent {
        const EVENT_TYPES: &'static [&'static str] = &["Incremented", "Frozen"];

        fn event_type(&self) -> &'static str {
            match self {
                CounterEvent::Incremented { .. } => "Incremented",
                CounterEvent::Frozen => "Frozen",
            }
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Counter {
        value: u32,
        frozen: bool,
    }

    impl Aggregate for Counter {
        type Event = CounterEvent;

        fn aggregate_type() -> &'static str {
            "Counter"
        }

        fn apply(&self, event: &Self::Event) -> Result<Self, InvalidTransition> {
            if self.frozen {
                return Err(InvalidTransition {
                    operation: event.event_type(),
                    state: "frozen",
                });
            }
            Ok(match event {
                CounterEvent::Incremented { by } => Counter {
                    value: self.value + by,
                    frozen: false,
                },
                CounterEvent::Frozen => Counter {
                    value: self.value,
                    frozen: true,
                },
            })
        }
    }

    fn handler(store: InMemoryEventStore) -> CommandHandler<InMemoryEventStore, Counter> {
        CommandHandler::new(store)
    }

    fn raw_event(event_type: &str, payload: serde_json::Value) -> NewEvent {
        NewEvent::builder()
            .event_type(event_type)
            .payload_raw(payload)
            .build()
    }

    #[test]
    fn stream_name_uses_aggregate_type() {
        let stream = CommandHandler::<InMemoryEventStore, Counter>::stream_name(
            &AggregateId::from("7"),
        );
        assert_eq!(stream.as_str(), "Counter$7");
    }

    #[test]
    fn replay_policy_parsing() {
        assert_eq!("reject".parse::<ReplayPolicy>(), Ok(ReplayPolicy::Reject));
        assert_eq!(" Skip ".parse::<ReplayPolicy>(), Ok(ReplayPolicy::Skip));
        assert!("ignore".parse::<ReplayPolicy>().is_err());
    }

    #[tokio::test]
    async fn load_missing_stream_yields_default_state() {
        let handler = handler(InMemoryEventStore::new());

        let loaded = handler.load(&AggregateId::new()).await.unwrap();

        assert_eq!(loaded.state, Counter::default());
        assert!(loaded.version.is_none());
        assert!(!loaded.exists());
    }

    #[tokio::test]
    async fn execute_appends_at_next_version() {
        let store = InMemoryEventStore::new();
        let handler = handler(store.clone());
        let id = AggregateId::new();

        let first = handler
            .execute(&id, CounterEvent::Incremented { by: 2 })
            .await
            .unwrap();
        assert_eq!(first.version, Version::first());

        let second = handler
            .execute(&id, CounterEvent::Incremented { by: 3 })
            .await
            .unwrap();
        assert_eq!(second.version, Version::new(1));
        assert_eq!(second.state.value, 5);

        let loaded = handler.load(&id).await.unwrap();
        assert_eq!(loaded.state.value, 5);
        assert_eq!(loaded.version, Some(Version::new(1)));
        assert_eq!(store.event_count().await, 2);
    }

    #[tokio::test]
    async fn illegal_event_is_not_written() {
        let store = InMemoryEventStore::new();
        let handler = handler(store.clone());
        let id = AggregateId::new();

        handler.execute(&id, CounterEvent::Frozen).await.unwrap();
        let result = handler
            .execute(&id, CounterEvent::Incremented { by: 1 })
            .await;

        assert!(matches!(result, Err(HandlerError::InvalidTransition(_))));
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn unknown_event_type_is_corrupt_by_default() {
        let store = InMemoryEventStore::new();
        let handler = handler(store.clone());
        let id = AggregateId::new();
        let stream = CommandHandler::<InMemoryEventStore, Counter>::stream_name(&id);

        store
            .append_event(
                &stream,
                raw_event("Renamed", serde_json::json!({"type": "Renamed"})),
                ExpectedVersion::NoStream,
            )
            .await
            .unwrap();

        let err = handler.load(&id).await.unwrap_err();
        assert!(matches!(
            err,
            HandlerError::CorruptHistory { version, .. } if version == Version::first()
        ));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn skip_policy_ignores_unknown_events_but_counts_them() {
        let store = InMemoryEventStore::new();
        let handler = handler(store.clone()).with_replay_policy(ReplayPolicy::Skip);
        let id = AggregateId::new();
        let stream = CommandHandler::<InMemoryEventStore, Counter>::stream_name(&id);

        handler
            .execute(&id, CounterEvent::Incremented { by: 4 })
            .await
            .unwrap();
        store
            .append_event(
                &stream,
                raw_event("Renamed", serde_json::json!({"type": "Renamed"})),
                ExpectedVersion::Exact(Version::first()),
            )
            .await
            .unwrap();

        let loaded = handler.load(&id).await.unwrap();
        assert_eq!(loaded.state.value, 4);
        assert_eq!(loaded.version, Some(Version::new(1)));

        let result = handler
            .execute(&id, CounterEvent::Incremented { by: 1 })
            .await
            .unwrap();
        assert_eq!(result.version, Version::new(2));
        assert_eq!(result.state.value, 5);
    }

    #[tokio::test]
    async fn undecodable_payload_is_corrupt_even_when_skipping() {
        let store = InMemoryEventStore::new();
        let handler = handler(store.clone()).with_replay_policy(ReplayPolicy::Skip);
        let id = AggregateId::new();
        let stream = CommandHandler::<InMemoryEventStore, Counter>::stream_name(&id);

        store
            .append_event(
                &stream,
                raw_event("Incremented", serde_json::json!({"type": "Incremented"})),
                ExpectedVersion::NoStream,
            )
            .await
            .unwrap();

        let err = handler.load(&id).await.unwrap_err();
        assert!(matches!(err, HandlerError::CorruptHistory { .. }));
    }

    #[tokio::test]
    async fn envelope_type_must_match_payload() {
        let store = InMemoryEventStore::new();
        let handler = handler(store.clone());
        let id = AggregateId::new();
        let stream = CommandHandler::<InMemoryEventStore, Counter>::stream_name(&id);

        store
            .append_event(
                &stream,
                raw_event("Incremented", serde_json::json!({"type": "Frozen"})),
                ExpectedVersion::NoStream,
            )
            .await
            .unwrap();

        let err = handler.load(&id).await.unwrap_err();
        match err {
            HandlerError::CorruptHistory { reason, .. } => {
                assert!(reason.contains("does not match"));
            }
            other => panic!("expected CorruptHistory, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn illegal_recorded_history_is_corrupt() {
        let store = InMemoryEventStore::new();
        let handler = handler(store.clone());
        let id = AggregateId::new();
        let stream = CommandHandler::<InMemoryEventStore, Counter>::stream_name(&id);

        let frozen = serde_json::to_value(CounterEvent::Frozen).unwrap();
        let incremented = serde_json::to_value(CounterEvent::Incremented { by: 1 }).unwrap();
        store
            .append(
                &stream,
                vec![
                    raw_event("Frozen", frozen),
                    raw_event("Incremented", incremented),
                ],
                ExpectedVersion::NoStream,
            )
            .await
            .unwrap();

        let err = handler.load(&id).await.unwrap_err();
        assert!(matches!(
            err,
            HandlerError::CorruptHistory { version, .. } if version == Version::new(1)
        ));
    }
}
