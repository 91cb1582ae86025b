//! Delivery history: paginated audit log plus aggregate statistics for the
//! admin surface. Read-only; the log itself is written by the recorder.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use herald_common::error::AppError;

/// Default page size for the history listing.
pub const DEFAULT_PER_PAGE: u32 = 50;
const MAX_PER_PAGE: u32 = 200;

/// One audit row joined with the names a human wants to see.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EventRecord {
    pub id: Uuid,
    pub service_name: String,
    pub chat_title: String,
    pub message_content: String,
    pub telegram_message_id: Option<i64>,
    pub success: bool,
    pub error_message: Option<String>,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventPage {
    pub events: Vec<EventRecord>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EventStats {
    pub total: i64,
    pub successful: i64,
    pub failed: i64,
}

/// Per-service or per-chat grouped delivery counts.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GroupedStats {
    pub name: String,
    pub total: i64,
    pub successful: i64,
    pub failed: i64,
}

pub struct DeliveryLog;

impl DeliveryLog {
    /// Fetch one page of delivery events, newest first.
    pub async fn page(pool: &PgPool, page: u32, per_page: u32) -> Result<EventPage, AppError> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, MAX_PER_PAGE);
        let offset = (page - 1) as i64 * per_page as i64;

        let events: Vec<EventRecord> = sqlx::query_as(
            r#"
            SELECT e.id, s.name AS service_name, c.title AS chat_title,
                   e.message_content, e.telegram_message_id, e.success,
                   e.error_message, e.sent_at
            FROM delivery_events e
            JOIN services s ON s.id = e.service_id
            JOIN chats c ON c.id = e.chat_id
            ORDER BY e.sent_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(per_page as i64)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM delivery_events")
            .fetch_one(pool)
            .await?;

        Ok(EventPage {
            events,
            total,
            page,
            per_page,
        })
    }

    /// Overall delivery counts.
    pub async fn stats(pool: &PgPool) -> Result<EventStats, AppError> {
        let stats: EventStats = sqlx::query_as(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE success) AS successful,
                   COUNT(*) FILTER (WHERE NOT success) AS failed
            FROM delivery_events
            "#,
        )
        .fetch_one(pool)
        .await?;
        Ok(stats)
    }

    /// Delivery counts grouped by originating service.
    pub async fn per_service_stats(pool: &PgPool) -> Result<Vec<GroupedStats>, AppError> {
        let stats: Vec<GroupedStats> = sqlx::query_as(
            r#"
            SELECT s.name AS name,
                   COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE e.success) AS successful,
                   COUNT(*) FILTER (WHERE NOT e.success) AS failed
            FROM delivery_events e
            JOIN services s ON s.id = e.service_id
            GROUP BY s.name
            ORDER BY s.name
            "#,
        )
        .fetch_all(pool)
        .await?;
        Ok(stats)
    }

    /// Delivery counts grouped by target chat.
    pub async fn per_chat_stats(pool: &PgPool) -> Result<Vec<GroupedStats>, AppError> {
        let stats: Vec<GroupedStats> = sqlx::query_as(
            r#"
            SELECT c.title AS name,
                   COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE e.success) AS successful,
                   COUNT(*) FILTER (WHERE NOT e.success) AS failed
            FROM delivery_events e
            JOIN chats c ON c.id = e.chat_id
            GROUP BY c.title
            ORDER BY c.title
            "#,
        )
        .fetch_all(pool)
        .await?;
        Ok(stats)
    }
}
