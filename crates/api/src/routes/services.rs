//! Service CRUD routes (admin only).

use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use herald_common::error::AppError;
use herald_common::types::{Chat, Service};
use herald_engine::services::{CreateServiceParams, ServiceRegistry, UpdateServiceParams};

use crate::middleware::auth::AuthAdmin;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/services", get(list_services).post(create_service))
        .route(
            "/api/services/{id}",
            get(get_service).patch(update_service).delete(delete_service),
        )
        .route("/api/services/{id}/chats", put(set_authorized_chats))
}

/// POST /api/services: register a service; the response carries the issued
/// API key, the only time an admin needs to read it.
async fn create_service(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Json(params): Json<CreateServiceParams>,
) -> Result<Json<Service>, AppError> {
    let service = ServiceRegistry::create(&state.pool, &params).await?;
    Ok(Json(service))
}

/// GET /api/services: list all registered services.
async fn list_services(
    State(state): State<AppState>,
    _admin: AuthAdmin,
) -> Result<Json<Vec<Service>>, AppError> {
    let services = ServiceRegistry::list(&state.pool).await?;
    Ok(Json(services))
}

/// GET /api/services/:id
async fn get_service(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<Service>, AppError> {
    let service = ServiceRegistry::get(&state.pool, id).await?;
    Ok(Json(service))
}

/// PATCH /api/services/:id: update name/label/description.
async fn update_service(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Path(id): Path<Uuid>,
    Json(params): Json<UpdateServiceParams>,
) -> Result<Json<Service>, AppError> {
    let service = ServiceRegistry::update_details(&state.pool, id, &params).await?;
    Ok(Json(service))
}

/// DELETE /api/services/:id: cascades authorization links and audit rows.
async fn delete_service(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    ServiceRegistry::delete(&state.pool, id).await?;
    Ok(Json(serde_json::json!({"deleted": true})))
}

#[derive(Debug, Deserialize)]
struct SetChatsParams {
    chat_ids: Vec<Uuid>,
}

/// PUT /api/services/:id/chats: replace the service's authorized chat set.
async fn set_authorized_chats(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Path(id): Path<Uuid>,
    Json(params): Json<SetChatsParams>,
) -> Result<Json<Vec<Chat>>, AppError> {
    let chats = ServiceRegistry::set_authorized_chats(&state.pool, id, &params.chat_ids).await?;
    Ok(Json(chats))
}
