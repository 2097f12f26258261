//! API routes definition

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the API router with all endpoints
///
/// Any origin may call the API; browsers send the bearer token explicitly,
/// never as a cookie.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Auth
        .route("/login", post(handlers::login))
        // Messages
        .route(
            "/messages",
            get(handlers::list_messages).post(handlers::send_message),
        )
        .route("/messages/protected", get(handlers::list_protected_messages))
        // Subscriptions
        .route(
            "/subscriptions/newMessage",
            get(handlers::subscribe_new_messages),
        )
        .route("/health", get(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .into_inner(),
        )
        .with_state(state)
}
