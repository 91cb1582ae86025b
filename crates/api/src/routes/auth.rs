//! Admin login route.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use herald_common::error::AppError;

use crate::middleware::auth::{encode_jwt, verify_admin_credentials};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/auth/login", post(login))
}

#[derive(Debug, Deserialize)]
struct LoginParams {
    username: String,
    password: String,
}

/// POST /api/auth/login: exchange admin credentials for a bearer token.
async fn login(
    State(state): State<AppState>,
    Json(params): Json<LoginParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    verify_admin_credentials(&state.config, &params.username, &params.password)?;

    let token = encode_jwt(
        &params.username,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;

    tracing::info!(username = %params.username, "Admin logged in");
    Ok(Json(serde_json::json!({ "token": token })))
}
