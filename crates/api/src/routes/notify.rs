//! The notify endpoint, the front door of the dispatch engine, plus the
//! admin test-message route.

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use herald_common::error::AppError;
use herald_engine::dispatcher::Dispatcher;
use herald_engine::intake;
use herald_engine::recorder::EventRecorder;
use herald_engine::summary::DispatchSummary;

use crate::middleware::auth::AuthAdmin;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notify", post(notify))
        .route("/api/test-message", post(test_message))
}

/// POST /api/notify: fan a message out to every chat the calling service
/// is authorized for.
///
/// The body is taken raw so payload validation runs before the credential
/// check: a malformed body is a 400 even when the API key is also missing.
async fn notify(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<DispatchSummary>, AppError> {
    let content_type = headers.get("content-type").and_then(|v| v.to_str().ok());
    intake::ensure_json_content_type(content_type)?;
    let message = intake::parse_notify_payload(&body)?;

    let api_key = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    let service = intake::resolve_service(&state.pool, api_key).await?;

    let transport = state.require_transport()?;
    let chats = intake::authorized_chats(&state.pool, &service).await?;

    let dispatcher = Dispatcher::new(
        transport,
        state.config.send_concurrency,
        Duration::from_secs(state.config.send_timeout_secs),
    );
    let output = dispatcher.dispatch(&service, &message, &chats).await;

    let persisted = EventRecorder::record_batch(
        &state.pool,
        &service,
        &chats,
        &output.outcomes,
        &output.formatted_text,
    )
    .await;

    let summary = DispatchSummary::from_results(&chats, &output.outcomes);

    tracing::info!(
        service = %service.name,
        recipients = summary.recipient_count,
        successful = summary.successful_sends,
        failed = summary.failed_sends,
        persisted,
        "Notification dispatched"
    );

    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
struct TestMessageParams {
    chat_id: i64,
    message: String,
}

/// POST /api/test-message: send a one-off message to an arbitrary chat id.
/// Admin-only; bypasses service authorization and the audit log.
async fn test_message(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Json(params): Json<TestMessageParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let transport = state.require_transport()?;
    let outcome = transport
        .send_message(params.chat_id, &params.message)
        .await;

    Ok(Json(serde_json::json!({
        "success": outcome.is_success(),
        "chat_id": params.chat_id,
        "message": params.message,
        "result": outcome,
    })))
}
