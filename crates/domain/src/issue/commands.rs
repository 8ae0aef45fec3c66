//! Issue commands.

use common::AggregateId;
use serde::{Deserialize, Serialize};

use super::Payload;

/// A request to move an issue through its lifecycle.
///
/// Commands carry no version: they act on whatever the latest state is
/// and rely on the append guard to detect races.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueCommand {
    /// The issue the command targets.
    pub issue_id: AggregateId,

    /// Operation discriminator (`open`, `start`, `stop`, `resolve`, `reopen`, `close`).
    pub operation: String,

    /// Optional data copied into the resulting event.
    #[serde(default)]
    pub payload: Option<Payload>,
}

impl IssueCommand {
    /// Creates a command without payload.
    pub fn new(issue_id: AggregateId, operation: impl Into<String>) -> Self {
        Self {
            issue_id,
            operation: operation.into(),
            payload: None,
        }
    }

    /// Attaches a payload to the command.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }
}
