//! Issue aggregate implementation.

use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, InvalidTransition};

use super::{IssueEvent, IssueState, Operation};

/// Issue aggregate root.
///
/// Carries no data beyond its lifecycle stage; the stage is always the
/// result of replaying the issue's stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Set by the first recorded event.
    id: Option<AggregateId>,

    state: IssueState,
}

impl Aggregate for Issue {
    type Event = IssueEvent;

    fn aggregate_type() -> &'static str {
        "Issue"
    }

    fn apply(&self, event: &Self::Event) -> Result<Self, InvalidTransition> {
        let state = self.state.transition(event.operation())?;
        Ok(Issue {
            id: self.id.clone().or_else(|| Some(event.issue_id().clone())),
            state,
        })
    }
}

impl Issue {
    /// Returns the issue ID, or None before the first event.
    pub fn id(&self) -> Option<&AggregateId> {
        self.id.as_ref()
    }

    /// Returns the current state.
    pub fn state(&self) -> IssueState {
        self.state
    }

    /// Returns the operations legal from the current state.
    pub fn available_operations(&self) -> Vec<Operation> {
        self.state.available_operations()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
