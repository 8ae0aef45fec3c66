//! Issue aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;
mod state;

pub use aggregate::Issue;
pub use commands::IssueCommand;
pub use events::{IssueEvent, IssueEventData};
pub use service::IssueCommandHandler;
pub use state::{IssueState, Operation};

/// Free-form data attached to a command and recorded on its event.
pub type Payload = serde_json::Map<String, serde_json::Value>;
