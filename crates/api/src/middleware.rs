//! API middleware.

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use quickpoll_core::{PollService, UserService};

use crate::streaming::StreamingState;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    /// Poll lifecycle service.
    pub poll_service: PollService,
    /// User account service.
    pub user_service: UserService,
    /// Realtime fan-out state.
    pub streaming: StreamingState,
}

/// Authentication middleware.
///
/// Resolves a `Bearer` session token to its user and stores the result as a
/// request extension. Requests without (or with invalid) credentials pass
/// through unauthenticated; the protection mode of each poll decides what
/// an anonymous viewer may do.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        if let Ok(Some(user)) = state.user_service.verify_token(token).await {
            req.extensions_mut().insert(user);
        }
    }

    next.run(req).await
}
