//! Router setup with all API routes and middleware.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use medchat_core::MedchatError;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Browser clients are only expected from localhost on the served port.
    let origins: Vec<HeaderValue> = ["127.0.0.1", "localhost"]
        .iter()
        .filter_map(|host| format!("http://{}:{}", host, state.port).parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/questions", get(handlers::questions))
        .route(
            "/sessions",
            get(handlers::list_sessions).post(handlers::create_session),
        )
        .route(
            "/sessions/{id}",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/sessions/{id}/ask", post(handlers::ask))
        .route(
            "/sessions/{id}/questions/{index}",
            post(handlers::ask_canned),
        )
        .route("/sessions/{id}/clear", post(handlers::clear_session))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the API on `127.0.0.1:{port}` until the process exits.
pub async fn start_server(state: AppState) -> Result<(), MedchatError> {
    let addr = format!("127.0.0.1:{}", state.port);
    let router = create_router(state);

    tracing::info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
