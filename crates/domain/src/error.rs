//! Command handling error types.

use event_store::{EventStoreError, ExpectedVersion, StreamName, Version};
use thiserror::Error;

use crate::aggregate::InvalidTransition;

/// Errors a command can end with.
///
/// Every variant leaves the stream exactly as it was before the command.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The command's operation discriminator is not recognized.
    #[error("Unknown command: {command}")]
    UnknownCommand { command: String },

    /// The operation is not legal from the aggregate's current state.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    /// Another writer appended to the stream after it was read.
    #[error(
        "Concurrency conflict on stream {stream}: expected version {expected}, found {}",
        display_tail(.actual)
    )]
    ConcurrencyConflict {
        stream: StreamName,
        expected: ExpectedVersion,
        actual: Option<Version>,
    },

    /// Reading or appending to the event log failed.
    #[error("Event log unavailable: {0}")]
    LogUnavailable(#[source] EventStoreError),

    /// Replaying recorded history failed; the stored stream is inconsistent.
    #[error("Corrupt history in stream {stream} at version {version}: {reason}")]
    CorruptHistory {
        stream: StreamName,
        version: Version,
        reason: String,
    },

    /// Encoding the new event failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn display_tail(actual: &Option<Version>) -> String {
    match actual {
        Some(version) => version.to_string(),
        None => "no stream".to_string(),
    }
}

impl HandlerError {
    /// Returns true if re-running the command (fresh read included) may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HandlerError::ConcurrencyConflict { .. } | HandlerError::LogUnavailable(_)
        )
    }

    /// Returns true if the aggregate's stored history is unusable.
    ///
    /// Processing of that aggregate should stop until the stream is repaired.
    pub fn is_fatal(&self) -> bool {
        matches!(self, HandlerError::CorruptHistory { .. })
    }

    /// Returns true if the command was refused by a business rule.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            HandlerError::UnknownCommand { .. } | HandlerError::InvalidTransition(_)
        )
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            HandlerError::UnknownCommand { .. } => "unknown_command",
            HandlerError::InvalidTransition(_) => "invalid_transition",
            HandlerError::ConcurrencyConflict { .. } => "concurrency_conflict",
            HandlerError::LogUnavailable(_) => "log_unavailable",
            HandlerError::CorruptHistory { .. } => "corrupt_history",
            HandlerError::Serialization(_) => "serialization",
        }
    }
}

impl From<EventStoreError> for HandlerError {
    fn from(err: EventStoreError) -> Self {
        match err {
            EventStoreError::ConcurrencyConflict {
                stream,
                expected,
                actual,
            } => HandlerError::ConcurrencyConflict {
                stream,
                expected,
                actual,
            },
            other => HandlerError::LogUnavailable(other),
        }
    }
}
