use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an aggregate instance.
///
/// The identifier is opaque: callers may supply any string (an external
/// ticket key, a UUID, ...). `new()` generates a random UUID for callers
/// that have no natural key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateId(String);

impl AggregateId {
    /// Creates a new random aggregate ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Creates an aggregate ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid.to_string())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AggregateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AggregateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Uuid> for AggregateId {
    fn from(uuid: Uuid) -> Self {
        Self::from_uuid(uuid)
    }
}

impl From<String> for AggregateId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for AggregateId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Name of the event stream holding one aggregate's history.
///
/// The format is `"<AggregateType>$<id>"`. Existing log data is addressed by
/// this exact string, so the format must never change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamName(String);

impl StreamName {
    /// Separator between the aggregate type tag and the aggregate id.
    pub const SEPARATOR: char = '$';

    /// Derives the stream name for an aggregate instance.
    pub fn for_aggregate(aggregate_type: &str, id: &AggregateId) -> Self {
        Self(format!("{aggregate_type}{}{id}", Self::SEPARATOR))
    }

    /// Wraps a raw stream name as stored in the log.
    pub fn from_raw(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the aggregate type tag, if the name follows the standard format.
    pub fn category(&self) -> Option<&str> {
        self.0.split_once(Self::SEPARATOR).map(|(category, _)| category)
    }

    /// Returns the aggregate id, if the name follows the standard format.
    pub fn aggregate_id(&self) -> Option<AggregateId> {
        self.0
            .split_once(Self::SEPARATOR)
            .map(|(_, id)| AggregateId::from(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StreamName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
