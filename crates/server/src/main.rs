//! Quickpoll server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware, routing::get};
use quickpoll_api::{StreamingState, middleware::AppState, router as api_router, streaming_handler};
use quickpoll_common::Config;
use quickpoll_core::{PollService, UserService};
use quickpoll_db::{MemoryPollStore, MemoryUserStore};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quickpoll=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting quickpoll server...");

    // Load configuration
    let config = Config::load()?;

    // Initialize stores
    let poll_store = Arc::new(MemoryPollStore::new());
    let user_store = Arc::new(MemoryUserStore::new());

    // Initialize services
    let poll_service = PollService::new(poll_store);
    let user_service = UserService::new(user_store, &config);

    // Initialize streaming state
    let streaming = StreamingState::new();

    // Create app state
    let state = AppState {
        poll_service,
        user_service,
        streaming,
    };

    // Build router
    let app = Router::new()
        .route("/streaming", get(streaming_handler))
        .merge(api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            quickpoll_api::middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}
