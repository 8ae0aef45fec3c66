//! Command side of the issue tracker.
//!
//! This crate provides:
//! - Aggregate and DomainEvent traits for event-sourced entities
//! - CommandHandler: read a stream, fold it into state, validate, append
//!   with an expected-version guard
//! - The Issue aggregate with its lifecycle state machine

pub mod aggregate;
pub mod command;
pub mod error;
pub mod issue;

pub use aggregate::{Aggregate, DomainEvent, InvalidTransition};
pub use command::{CommandHandler, CommandResult, Loaded, ReplayPolicy};
pub use error::HandlerError;
pub use issue::{
    Issue, IssueCommand, IssueCommandHandler, IssueEvent, IssueEventData, IssueState, Operation,
    Payload,
};
