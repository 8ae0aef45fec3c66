//! Issue command and query endpoints.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::AggregateId;
use domain::{HandlerError, IssueCommand, IssueCommandHandler, Payload};
use event_store::{EventStore, Version};
use serde::Serialize;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: EventStore> {
    pub issues: IssueCommandHandler<S>,
    pub event_store: S,
}

// -- Response types --

#[derive(Serialize)]
pub struct CommandResponse {
    pub issue_id: String,
    pub state: String,
    pub version: u64,
}

#[derive(Serialize)]
pub struct IssueResponse {
    pub issue_id: String,
    pub state: String,
    pub version: u64,
    pub available_operations: Vec<String>,
}

/// Response type for event envelope data.
#[derive(Serialize)]
pub struct EventEnvelopeResponse {
    pub event_id: String,
    pub event_type: String,
    pub stream: String,
    pub version: u64,
    pub timestamp: String,
    pub payload: serde_json::Value,
}

// -- Handlers --

/// POST /issues/{id}/{operation}: run one lifecycle command.
///
/// The optional body is a JSON object recorded as the event payload.
#[tracing::instrument(skip(state, body))]
pub async fn command<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((id, operation)): Path<(String, String)>,
    body: Bytes,
) -> Result<(StatusCode, Json<CommandResponse>), ApiError> {
    let issue_id = AggregateId::from(id);
    let mut cmd = IssueCommand::new(issue_id.clone(), operation);
    if let Some(payload) = parse_payload(&body)? {
        cmd = cmd.with_payload(payload);
    }

    let result = state.issues.handle(cmd).await?;

    let status = if result.version == Version::first() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(CommandResponse {
            issue_id: issue_id.to_string(),
            state: result.state.state().to_string(),
            version: result.version.as_u64(),
        }),
    ))
}

/// GET /issues/{id}: current state rebuilt from the issue's stream.
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<IssueResponse>, ApiError> {
    let issue_id = AggregateId::from(id);
    let loaded = state
        .issues
        .get_issue(&issue_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Issue {issue_id} not found")))?;

    // A loaded issue always has a version.
    let version = loaded.version.map(|v| v.as_u64()).unwrap_or_default();

    Ok(Json(IssueResponse {
        issue_id: issue_id.to_string(),
        state: loaded.state.state().to_string(),
        version,
        available_operations: loaded
            .state
            .available_operations()
            .into_iter()
            .map(|op| op.to_string())
            .collect(),
    }))
}

/// GET /issues/{id}/events: list every recorded event of an issue.
#[tracing::instrument(skip(state))]
pub async fn events<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<EventEnvelopeResponse>>, ApiError> {
    let stream = IssueCommandHandler::<S>::stream_name(&AggregateId::from(id));

    let envelopes = state
        .event_store
        .read_stream(&stream)
        .await
        .map_err(HandlerError::from)?;

    let responses: Vec<EventEnvelopeResponse> = envelopes
        .into_iter()
        .map(|e| EventEnvelopeResponse {
            event_id: e.event_id.to_string(),
            event_type: e.event_type,
            stream: e.stream.to_string(),
            version: e.version.as_u64(),
            timestamp: e.timestamp.to_rfc3339(),
            payload: e.payload,
        })
        .collect();

    Ok(Json(responses))
}

fn parse_payload(body: &[u8]) -> Result<Option<Payload>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| ApiError::BadRequest(format!("Payload must be a JSON object: {e}")))
}
