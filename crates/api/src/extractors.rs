//! Request extractors.

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{StatusCode, request::Parts},
};
use quickpoll_core::UserView;
use quickpoll_db::entities::Identity;
use std::net::SocketAddr;

/// Per-request viewer identity extractor.
///
/// Combines the authenticated user placed in the request extensions by the
/// auth middleware with the client IP. Either part may be absent; both absent
/// is a legal anonymous viewer.
#[derive(Debug, Clone)]
pub struct Viewer(pub Identity);

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let username = parts
            .extensions
            .get::<UserView>()
            .map(|user| user.username.clone());

        Ok(Self(Identity {
            username,
            ip: client_ip(parts),
        }))
    }
}

/// Client IP: first `X-Forwarded-For` hop, else the socket peer address.
fn client_ip(parts: &Parts) -> Option<String> {
    if let Some(forwarded) = parts.headers.get("x-forwarded-for")
        && let Ok(value) = forwarded.to_str()
    {
        let first = value.split(',').next().unwrap_or("").trim();
        if !first.is_empty() {
            return Some(first.to_string());
        }
    }

    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
}
