//! Poll endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use quickpoll_common::{AppError, AppResult};
use quickpoll_core::{CreatePollInput, PollView, VoteInput};
use quickpoll_db::entities::Poll;

use crate::{
    extractors::Viewer,
    middleware::AppState,
    streaming::{POLLS_ROOM, PollMessage, poll_room},
};

/// List all polls, projected for the viewer.
async fn get_polls(
    Viewer(viewer): Viewer,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<PollView>>> {
    let polls = state.poll_service.get_all(&viewer).await?;
    Ok(Json(polls))
}

/// Get one poll, projected for the viewer.
async fn get_poll(
    Viewer(viewer): Viewer,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let view = state.poll_service.get_by_id(&viewer, &id).await?;

    Ok(match view {
        Some(view) => Json(view).into_response(),
        None => StatusCode::BAD_REQUEST.into_response(),
    })
}

/// Create a poll.
///
/// Responds with the stored poll as validated, not a projection; the
/// creator identity is never serialized.
async fn create_poll(
    Viewer(viewer): Viewer,
    State(state): State<AppState>,
    Json(input): Json<CreatePollInput>,
) -> AppResult<Json<Poll>> {
    let poll = state.poll_service.create(&viewer, input).await?;

    let data = serde_json::to_value(&poll)
        .map_err(|e| AppError::Internal(format!("Failed to encode poll: {e}")))?;
    state
        .streaming
        .publish(vec![POLLS_ROOM.to_string()], PollMessage::Created(data));

    Ok(Json(poll))
}

/// Cast a vote.
///
/// The no-op outcome (poll missing, or deleted mid-vote) maps to 304.
async fn vote_poll(
    Viewer(viewer): Viewer,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<VoteInput>,
) -> AppResult<Response> {
    match state.poll_service.vote(&viewer, &id, input).await? {
        Some(view) => {
            let data = serde_json::to_value(&view)
                .map_err(|e| AppError::Internal(format!("Failed to encode poll: {e}")))?;
            state.streaming.publish(
                vec![POLLS_ROOM.to_string(), poll_room(&id)],
                PollMessage::Updated(data),
            );

            Ok(Json(view).into_response())
        }
        None => Ok(StatusCode::NOT_MODIFIED.into_response()),
    }
}

/// Delete a poll.
///
/// 204 when a poll was removed; 304 when nothing was (not found or not
/// owned — indistinguishable by design).
async fn delete_poll(
    Viewer(viewer): Viewer,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    if state.poll_service.delete(&viewer, &id).await? {
        state.streaming.publish(
            vec![POLLS_ROOM.to_string(), poll_room(&id)],
            PollMessage::Deleted(id),
        );
        Ok(StatusCode::NO_CONTENT)
    } else {
        Ok(StatusCode::NOT_MODIFIED)
    }
}

/// Poll routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_polls).post(create_poll))
        .route("/{id}", get(get_poll).put(vote_poll).delete(delete_poll))
}
