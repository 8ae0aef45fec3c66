//! Issue domain events.

use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{Operation, Payload};

/// Events that can occur on an issue aggregate.
///
/// Each variant records one transition of the lifecycle; see
/// [`IssueEvent::operation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum IssueEvent {
    IssueOpened(IssueEventData),
    IssueProgressStarted(IssueEventData),
    IssueProgressStopped(IssueEventData),
    IssueResolved(IssueEventData),
    IssueReopened(IssueEventData),
    IssueClosed(IssueEventData),
}

/// Data carried by every issue event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueEventData {
    /// The issue the event belongs to.
    pub issue_id: AggregateId,

    /// Free-form payload supplied with the command.
    #[serde(default, skip_serializing_if = "Payload::is_empty")]
    pub payload: Payload,
}

impl DomainEvent for IssueEvent {
    const EVENT_TYPES: &'static [&'static str] = &[
        "IssueOpened",
        "IssueProgressStarted",
        "IssueProgressStopped",
        "IssueResolved",
        "IssueReopened",
        "IssueClosed",
    ];

    fn event_type(&self) -> &'static str {
        match self {
            IssueEvent::IssueOpened(_) => "IssueOpened",
            IssueEvent::IssueProgressStarted(_) => "IssueProgressStarted",
            IssueEvent::IssueProgressStopped(_) => "IssueProgressStopped",
            IssueEvent::IssueResolved(_) => "IssueResolved",
            IssueEvent::IssueReopened(_) => "IssueReopened",
            IssueEvent::IssueClosed(_) => "IssueClosed",
        }
    }

    fn aggregate_id(&self) -> Option<&AggregateId> {
        Some(self.issue_id())
    }
}

impl IssueEvent {
    /// Builds the event recording `operation`.
    pub fn for_operation(operation: Operation, issue_id: AggregateId, payload: Payload) -> Self {
        let data = IssueEventData { issue_id, payload };
        match operation {
            Operation::Open => IssueEvent::IssueOpened(data),
            Operation::Start => IssueEvent::IssueProgressStarted(data),
            Operation::Stop => IssueEvent::IssueProgressStopped(data),
            Operation::Resolve => IssueEvent::IssueResolved(data),
            Operation::Reopen => IssueEvent::IssueReopened(data),
            Operation::Close => IssueEvent::IssueClosed(data),
        }
    }

    /// The transition this event records.
    pub fn operation(&self) -> Operation {
        match self {
            IssueEvent::IssueOpened(_) => Operation::Open,
            IssueEvent::IssueProgressStarted(_) => Operation::Start,
            IssueEvent::IssueProgressStopped(_) => Operation::Stop,
            IssueEvent::IssueResolved(_) => Operation::Resolve,
            IssueEvent::IssueReopened(_) => Operation::Reopen,
            IssueEvent::IssueClosed(_) => Operation::Close,
        }
    }

    pub fn data(&self) -> &IssueEventData {
        match self {
            IssueEvent::IssueOpened(data)
            | IssueEvent::IssueProgressStarted(data)
            | IssueEvent::IssueProgressStopped(data)
            | IssueEvent::IssueResolved(data)
            | IssueEvent::IssueReopened(data)
            | IssueEvent::IssueClosed(data) => data,
        }
    }

    pub fn issue_id(&self) -> &AggregateId {
        &self.data().issue_id
    }
}
