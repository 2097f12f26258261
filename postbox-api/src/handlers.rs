//! HTTP API handlers

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use postbox_core::health::HealthReport;
use postbox_core::{MessageRecord, SendMessage};
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::auth::Caller;
use crate::error::ApiResult;
use crate::state::AppState;
use crate::types::{LoginRequest, LoginResponse};

/// SSE event name carrying a new message
pub const NEW_MESSAGE_EVENT: &str = "newMessage";

/// POST /login - Exchange email and password for a bearer token
pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(req) = body?;
    let outcome = state.service.login(&req.email, &req.password).await?;
    Ok(Json(outcome.into()))
}

/// GET /messages - List every stored message
pub async fn list_messages(State(state): State<Arc<AppState>>) -> Json<Vec<MessageRecord>> {
    Json(state.service.messages().await)
}

/// GET /messages/protected - List every stored message (authenticated)
pub async fn list_protected_messages(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
) -> ApiResult<Json<Vec<MessageRecord>>> {
    Ok(Json(state.service.protected_messages(&ctx).await?))
}

/// POST /messages - Send a message as the authenticated caller
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    body: Result<Json<SendMessage>, JsonRejection>,
) -> ApiResult<Json<MessageRecord>> {
    let Json(req) = body?;
    Ok(Json(state.service.send_message(&ctx, req).await?))
}

/// GET /subscriptions/newMessage - Stream messages sent from now on
///
/// The subscription is registered before the response is returned, so a
/// message sent after this handler completes is never missed. When the
/// client goes away axum drops the stream, which unregisters it.
pub async fn subscribe_new_messages(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.service.subscribe_new_messages();
    debug!(subscription = %subscription.id(), "SSE stream opened");

    let events = subscription.filter_map(|record| {
        match Event::default().event(NEW_MESSAGE_EVENT).json_data(&record) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                warn!(error = %e, "Failed to encode message event");
                None
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// GET /health - Health report
///
/// Always 200 while the process serves; degradation is in the body.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    Json(state.service.health().await)
}
