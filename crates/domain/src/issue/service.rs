//! Issue command handler: one entry point per lifecycle operation.

use common::AggregateId;
use event_store::{EventStore, StreamName};

use crate::command::{CommandHandler, CommandResult, Loaded, ReplayPolicy};
use crate::error::HandlerError;

use super::{Issue, IssueCommand, IssueEvent, Operation, Payload};

/// Handles issue commands against an event store.
///
/// Every entry point runs the same read, fold, validate and append flow
/// with a fixed operation. None of them retries on conflict.
pub struct IssueCommandHandler<S: EventStore> {
    handler: CommandHandler<S, Issue>,
}

impl<S: EventStore> IssueCommandHandler<S> {
    /// Creates a new issue command handler with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    /// Sets how replay treats unknown event types.
    pub fn with_replay_policy(self, policy: ReplayPolicy) -> Self {
        Self {
            handler: self.handler.with_replay_policy(policy),
        }
    }

    /// Returns a reference to the underlying command handler.
    pub fn handler(&self) -> &CommandHandler<S, Issue> {
        &self.handler
    }

    /// Returns the stream name for an issue (`Issue$<id>`).
    pub fn stream_name(issue_id: &AggregateId) -> StreamName {
        CommandHandler::<S, Issue>::stream_name(issue_id)
    }

    /// Handles a command given as plain data.
    ///
    /// An unrecognized operation fails with `UnknownCommand` before the
    /// stream is read.
    #[tracing::instrument(skip(self, cmd), fields(issue_id = %cmd.issue_id, operation = %cmd.operation))]
    pub async fn handle(&self, cmd: IssueCommand) -> Result<CommandResult<Issue>, HandlerError> {
        let Some(operation) = Operation::from_discriminator(&cmd.operation) else {
            metrics::counter!(
                "commands_rejected_total",
                "aggregate" => "Issue",
                "reason" => "unknown_command"
            )
            .increment(1);
            return Err(HandlerError::UnknownCommand {
                command: cmd.operation,
            });
        };

        self.dispatch(cmd.issue_id, operation, cmd.payload.unwrap_or_default())
            .await
    }

    /// Opens a new issue.
    pub async fn create(
        &self,
        issue_id: AggregateId,
        payload: Option<Payload>,
    ) -> Result<CommandResult<Issue>, HandlerError> {
        self.dispatch(issue_id, Operation::Open, payload.unwrap_or_default())
            .await
    }

    /// Starts work on an open issue.
    pub async fn start(
        &self,
        issue_id: AggregateId,
        payload: Option<Payload>,
    ) -> Result<CommandResult<Issue>, HandlerError> {
        self.dispatch(issue_id, Operation::Start, payload.unwrap_or_default())
            .await
    }

    /// Stops work on an issue in progress.
    pub async fn stop(
        &self,
        issue_id: AggregateId,
        payload: Option<Payload>,
    ) -> Result<CommandResult<Issue>, HandlerError> {
        self.dispatch(issue_id, Operation::Stop, payload.unwrap_or_default())
            .await
    }

    /// Resolves an open or in-progress issue.
    pub async fn resolve(
        &self,
        issue_id: AggregateId,
        payload: Option<Payload>,
    ) -> Result<CommandResult<Issue>, HandlerError> {
        self.dispatch(issue_id, Operation::Resolve, payload.unwrap_or_default())
            .await
    }

    /// Reopens a resolved issue.
    pub async fn reopen(
        &self,
        issue_id: AggregateId,
        payload: Option<Payload>,
    ) -> Result<CommandResult<Issue>, HandlerError> {
        self.dispatch(issue_id, Operation::Reopen, payload.unwrap_or_default())
            .await
    }

    /// Closes an open, in-progress or resolved issue.
    pub async fn close(
        &self,
        issue_id: AggregateId,
        payload: Option<Payload>,
    ) -> Result<CommandResult<Issue>, HandlerError> {
        self.dispatch(issue_id, Operation::Close, payload.unwrap_or_default())
            .await
    }

    /// Loads an issue by replaying its stream.
    ///
    /// Returns None if the issue has no history.
    #[tracing::instrument(skip(self))]
    pub async fn get_issue(
        &self,
        issue_id: &AggregateId,
    ) -> Result<Option<Loaded<Issue>>, HandlerError> {
        let loaded = self.handler.load(issue_id).await?;
        Ok(loaded.exists().then_some(loaded))
    }

    async fn dispatch(
        &self,
        issue_id: AggregateId,
        operation: Operation,
        payload: Payload,
    ) -> Result<CommandResult<Issue>, HandlerError> {
        let event = IssueEvent::for_operation(operation, issue_id.clone(), payload);
        self.handler.execute(&issue_id, event).await
    }
}
