//! User endpoints.

use axum::{Json, Router, extract::State, routing::post};
use quickpoll_common::AppResult;
use quickpoll_core::{AuthSession, RegisterInput};
use serde::Deserialize;

use crate::middleware::AppState;

/// Authenticate request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuthenticateRequest {
    pub username: String,
    pub password: String,
}

/// Register a new account; responds with a signed-in session.
async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> AppResult<Json<AuthSession>> {
    let session = state.user_service.register(input).await?;
    Ok(Json(session))
}

/// Sign in to an existing account.
async fn authenticate(
    State(state): State<AppState>,
    Json(req): Json<AuthenticateRequest>,
) -> AppResult<Json<AuthSession>> {
    let session = state
        .user_service
        .authenticate(&req.username, &req.password)
        .await?;
    Ok(Json(session))
}

/// User routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/authenticate", post(authenticate))
}
