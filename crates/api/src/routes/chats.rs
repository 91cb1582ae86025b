//! Chat CRUD routes (admin only), including the discovery sweep.

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use uuid::Uuid;

use herald_common::error::AppError;
use herald_common::types::Chat;
use herald_engine::chats::{ChatRegistry, CreateChatParams, UpdateChatParams};

use crate::middleware::auth::AuthAdmin;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/chats",
            get(list_chats).post(create_chat).delete(clear_chats),
        )
        .route("/api/chats/{id}", patch(update_chat).delete(delete_chat))
        .route("/api/chats/{id}/toggle-tester", post(toggle_tester))
        .route("/api/chats/refresh", post(refresh_chats))
}

/// POST /api/chats: register a chat by hand.
async fn create_chat(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Json(params): Json<CreateChatParams>,
) -> Result<Json<Chat>, AppError> {
    let chat = ChatRegistry::create(&state.pool, &params).await?;
    Ok(Json(chat))
}

/// GET /api/chats: list all registered chats.
async fn list_chats(
    State(state): State<AppState>,
    _admin: AuthAdmin,
) -> Result<Json<Vec<Chat>>, AppError> {
    let chats = ChatRegistry::list(&state.pool).await?;
    Ok(Json(chats))
}

/// PATCH /api/chats/:id: edit details; the telegram id is immutable.
async fn update_chat(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Path(id): Path<Uuid>,
    Json(params): Json<UpdateChatParams>,
) -> Result<Json<Chat>, AppError> {
    let chat = ChatRegistry::update_details(&state.pool, id, &params).await?;
    Ok(Json(chat))
}

/// DELETE /api/chats/:id
async fn delete_chat(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    ChatRegistry::delete(&state.pool, id).await?;
    Ok(Json(serde_json::json!({"deleted": true})))
}

/// DELETE /api/chats: destructive bulk clear of every registered chat.
async fn clear_chats(
    State(state): State<AppState>,
    _admin: AuthAdmin,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = ChatRegistry::clear_all(&state.pool).await?;
    Ok(Json(serde_json::json!({"deleted": deleted})))
}

/// POST /api/chats/:id/toggle-tester
async fn toggle_tester(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<Chat>, AppError> {
    let chat = ChatRegistry::toggle_tester(&state.pool, id).await?;
    Ok(Json(chat))
}

/// POST /api/chats/refresh: sweep recent bot updates and register any chats
/// not yet known. Needs the transport; only sees chats with recent activity.
async fn refresh_chats(
    State(state): State<AppState>,
    _admin: AuthAdmin,
) -> Result<Json<serde_json::Value>, AppError> {
    let transport = state.require_transport()?;

    let discovered = transport
        .discover_chats()
        .await
        .map_err(|e| AppError::Transport(e.to_string()))?;
    let added = ChatRegistry::upsert_discovered(&state.pool, &discovered).await?;

    tracing::info!(discovered = discovered.len(), added, "Chat discovery sweep finished");
    Ok(Json(serde_json::json!({
        "discovered": discovered.len(),
        "added": added,
    })))
}
