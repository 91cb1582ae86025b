pub mod auth;
pub mod chats;
pub mod health;
pub mod history;
pub mod notify;
pub mod services;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(notify::router())
        .merge(services::router())
        .merge(chats::router())
        .merge(history::router())
        .with_state(state)
}
