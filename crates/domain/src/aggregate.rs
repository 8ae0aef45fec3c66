//! Core aggregate and domain event traits.

use common::AggregateId;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Every event type this enum can decode.
    ///
    /// Replay consults this list to tell an event kind it has never heard
    /// of apart from a known kind with a damaged payload.
    const EVENT_TYPES: &'static [&'static str];

    /// Returns the event type name.
    ///
    /// This is used for serialization and event store filtering.
    fn event_type(&self) -> &'static str;

    /// Returns true if `event_type` is one of [`Self::EVENT_TYPES`].
    fn is_known_type(event_type: &str) -> bool {
        Self::EVENT_TYPES.contains(&event_type)
    }

    /// The aggregate instance this event was recorded for, if the event
    /// carries its id. Replay rejects an event whose id does not match the
    /// stream it was read from.
    fn aggregate_id(&self) -> Option<&AggregateId> {
        None
    }
}

/// An operation was attempted from a state that does not allow it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid transition: cannot {operation} from {state} state")]
pub struct InvalidTransition {
    pub operation: &'static str,
    pub state: &'static str,
}

/// Trait for aggregates in an event-sourced system.
///
/// The aggregate value is the state obtained by replaying its stream. It is
/// immutable: `apply` hands back the next state instead of mutating.
///
/// The same `apply` drives both replay of recorded history and validation
/// of a new event, so the two can never disagree about what is legal.
pub trait Aggregate: Default + Clone + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// Returns the aggregate type name.
    ///
    /// Used as the category prefix of the aggregate's stream name.
    fn aggregate_type() -> &'static str;

    /// Computes the state after `event`.
    ///
    /// Must be pure and deterministic. Fails if the event's transition is
    /// not legal from the current state.
    fn apply(&self, event: &Self::Event) -> Result<Self, InvalidTransition>;

    /// Folds a sequence of events, starting from this state.
    fn replay<'a>(
        &self,
        events: impl IntoIterator<Item = &'a Self::Event>,
    ) -> Result<Self, InvalidTransition>
    where
        Self::Event: 'a,
    {
        events
            .into_iter()
            .try_fold(self.clone(), |state, event| state.apply(event))
    }
}
