//! Issue state machine.

use serde::{Deserialize, Serialize};

use crate::aggregate::InvalidTransition;

/// The lifecycle stage of an issue.
///
/// State transitions:
/// ```text
///            open          start
///   New ──────────► Open ◄───────► InProgress
///                   │  ▲    stop       │
///           resolve │  │ reopen        │ resolve
///                   ▼  │               │
///                 Resolved ◄───────────┘
///
///   Open / InProgress / Resolved ── close ──► Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum IssueState {
    /// No event recorded yet.
    #[default]
    New,

    Open,

    /// Someone is working on the issue.
    InProgress,

    Resolved,

    /// Terminal state.
    Closed,
}

/// A transition that can be requested on an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Open,
    Start,
    Stop,
    Resolve,
    Reopen,
    Close,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::Open,
        Operation::Start,
        Operation::Stop,
        Operation::Resolve,
        Operation::Reopen,
        Operation::Close,
    ];

    /// Maps a command discriminator to an operation.
    ///
    /// `create` is accepted as an alias of `open`.
    pub fn from_discriminator(discriminator: &str) -> Option<Self> {
        match discriminator {
            "open" | "create" => Some(Operation::Open),
            "start" => Some(Operation::Start),
            "stop" => Some(Operation::Stop),
            "resolve" => Some(Operation::Resolve),
            "reopen" => Some(Operation::Reopen),
            "close" => Some(Operation::Close),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Open => "open",
            Operation::Start => "start",
            Operation::Stop => "stop",
            Operation::Resolve => "resolve",
            Operation::Reopen => "reopen",
            Operation::Close => "close",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl IssueState {
    /// Returns the state reached by performing `operation` from this state.
    ///
    /// This table is the single definition of the issue lifecycle; replay
    /// and command validation both go through it.
    pub fn transition(self, operation: Operation) -> Result<IssueState, InvalidTransition> {
        use IssueState::*;
        use Operation as Op;

        match (self, operation) {
            (New, Op::Open) => Ok(Open),
            (Open, Op::Start) => Ok(InProgress),
            (InProgress, Op::Stop) => Ok(Open),
            (Open | InProgress, Op::Resolve) => Ok(Resolved),
            (Resolved, Op::Reopen) => Ok(Open),
            (Open | InProgress | Resolved, Op::Close) => Ok(Closed),
            (state, operation) => Err(InvalidTransition {
                operation: operation.as_str(),
                state: state.as_str(),
            }),
        }
    }

    /// Returns true if `operation` is legal from this state.
    pub fn allows(&self, operation: Operation) -> bool {
        self.transition(operation).is_ok()
    }

    /// Returns the operations legal from this state.
    pub fn available_operations(&self) -> Vec<Operation> {
        Operation::ALL
            .into_iter()
            .filter(|op| self.allows(*op))
            .collect()
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, IssueState::Closed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueState::New => "New",
            IssueState::Open => "Open",
            IssueState::InProgress => "InProgress",
            IssueState::Resolved => "Resolved",
            IssueState::Closed => "Closed",
        }
    }
}

impl std::fmt::Display for IssueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
