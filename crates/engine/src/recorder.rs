//! Event recorder: append-only audit trail of delivery attempts.
//!
//! Every attempt, success or failure, becomes exactly one `delivery_events`
//! row. Persistence is best-effort per row: rows are independent appends,
//! not one transaction, so an insert failure for one recipient never costs
//! the audit trail of the others.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use herald_common::types::{Chat, DeliveryOutcome, Service};

pub struct EventRecorder;

impl EventRecorder {
    /// Persist one audit row per (chat, outcome) pair.
    ///
    /// `formatted_text` must be the exact text that went over the wire, not
    /// the caller's raw message. Returns how many rows were persisted;
    /// failures are logged and skipped, never escalated. The sends already
    /// happened and the caller must not be told to retry them.
    pub async fn record_batch(
        pool: &PgPool,
        service: &Service,
        chats: &[Chat],
        outcomes: &[DeliveryOutcome],
        formatted_text: &str,
    ) -> usize {
        let mut persisted = 0;

        for (chat, outcome) in chats.iter().zip(outcomes) {
            let result = sqlx::query(
                r#"
                INSERT INTO delivery_events
                    (id, service_id, chat_id, message_content, telegram_message_id, success, error_message, sent_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(service.id)
            .bind(chat.id)
            .bind(formatted_text)
            .bind(outcome.message_id())
            .bind(outcome.is_success())
            .bind(outcome.error())
            .bind(Utc::now())
            .execute(pool)
            .await;

            match result {
                Ok(_) => persisted += 1,
                Err(err) => {
                    tracing::warn!(
                        service_id = %service.id,
                        chat_id = %chat.id,
                        telegram_id = chat.telegram_id,
                        error = %err,
                        "Failed to persist delivery event"
                    );
                }
            }
        }

        persisted
    }
}
