//! HTTP API layer for quickpoll.
//!
//! This crate provides the REST API and real-time streaming:
//!
//! - **Endpoints**: poll and user routes
//! - **Extractors**: the per-request viewer identity
//! - **Middleware**: bearer-token authentication
//! - **Streaming**: WebSocket fan-out over named rooms
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod streaming;

pub use endpoints::router;
pub use streaming::{PollMessage, StreamingState, poll_room, streaming_handler, POLLS_ROOM};
