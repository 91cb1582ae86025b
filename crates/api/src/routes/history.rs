//! Delivery history route (admin only).

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use herald_common::error::AppError;
use herald_engine::history::{DeliveryLog, EventRecord, GroupedStats, DEFAULT_PER_PAGE};

use crate::middleware::auth::AuthAdmin;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/history", get(history))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    page: Option<u32>,
    per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    events: Vec<EventRecord>,
    total_events: i64,
    successful_events: i64,
    failed_events: i64,
    service_stats: Vec<GroupedStats>,
    chat_stats: Vec<GroupedStats>,
    page: u32,
    per_page: u32,
}

/// GET /api/history?page=&per_page=
///
/// One call returns the requested page plus the aggregate counters the
/// dashboard renders alongside it.
async fn history(
    State(state): State<AppState>,
    _admin: AuthAdmin,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let page = query.page.unwrap_or(1);
    let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE);

    let event_page = DeliveryLog::page(&state.pool, page, per_page).await?;
    let stats = DeliveryLog::stats(&state.pool).await?;
    let service_stats = DeliveryLog::per_service_stats(&state.pool).await?;
    let chat_stats = DeliveryLog::per_chat_stats(&state.pool).await?;

    Ok(Json(HistoryResponse {
        events: event_page.events,
        total_events: stats.total,
        successful_events: stats.successful,
        failed_events: stats.failed,
        service_stats,
        chat_stats,
        page: event_page.page,
        per_page: event_page.per_page,
    }))
}
