//! API endpoint handlers.

pub mod polls;
pub mod users;

use axum::Router;

use crate::middleware::AppState;

/// Build the API router.
#[must_use]
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/users", users::router())
        .nest("/polls", polls::router())
}
