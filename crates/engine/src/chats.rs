//! Chat registry: admin CRUD for Telegram delivery targets.

use sqlx::PgPool;
use uuid::Uuid;

use herald_common::error::{AppError, conflict_on_unique};
use herald_common::types::{Chat, ChatType, DiscoveredChat};

pub struct ChatRegistry;

/// Parameters for registering a chat by hand.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CreateChatParams {
    pub telegram_id: i64,
    pub title: String,
    pub username: Option<String>,
    #[serde(default)]
    pub chat_type: Option<ChatType>,
    pub label: Option<String>,
    pub description: Option<String>,
}

/// Parameters for editing chat details. The telegram id is immutable.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct UpdateChatParams {
    pub title: Option<String>,
    pub username: Option<String>,
    pub chat_type: Option<ChatType>,
    pub label: Option<String>,
    pub description: Option<String>,
}

impl ChatRegistry {
    pub async fn create(pool: &PgPool, params: &CreateChatParams) -> Result<Chat, AppError> {
        let title = params.title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Chat title is required".to_string()));
        }

        let chat: Chat = sqlx::query_as(
            r#"
            INSERT INTO chats (id, telegram_id, title, username, chat_type, label, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(params.telegram_id)
        .bind(title)
        .bind(&params.username)
        .bind(params.chat_type.unwrap_or(ChatType::Private))
        .bind(&params.label)
        .bind(&params.description)
        .fetch_one(pool)
        .await
        .map_err(|e| conflict_on_unique(e, "A chat with this Telegram ID already exists"))?;

        tracing::info!(chat_id = %chat.id, telegram_id = chat.telegram_id, title = %chat.title, "Chat registered");
        Ok(chat)
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Chat>, AppError> {
        let chats: Vec<Chat> = sqlx::query_as("SELECT * FROM chats ORDER BY title, telegram_id")
            .fetch_all(pool)
            .await?;
        Ok(chats)
    }

    pub async fn get(pool: &PgPool, chat_id: Uuid) -> Result<Chat, AppError> {
        let chat: Chat = sqlx::query_as("SELECT * FROM chats WHERE id = $1")
            .bind(chat_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Chat {} not found", chat_id)))?;
        Ok(chat)
    }

    /// Update chat details. Omitted fields keep their value.
    pub async fn update_details(
        pool: &PgPool,
        chat_id: Uuid,
        params: &UpdateChatParams,
    ) -> Result<Chat, AppError> {
        let existing = Self::get(pool, chat_id).await?;

        let title = match &params.title {
            Some(title) if title.trim().is_empty() => {
                return Err(AppError::Validation("Chat title is required".to_string()));
            }
            Some(title) => title.trim().to_string(),
            None => existing.title,
        };
        let username = params.username.clone().or(existing.username);
        let chat_type = params.chat_type.unwrap_or(existing.chat_type);
        let label = params.label.clone().or(existing.label);
        let description = params.description.clone().or(existing.description);

        let chat: Chat = sqlx::query_as(
            r#"
            UPDATE chats
            SET title = $1, username = $2, chat_type = $3, label = $4, description = $5, updated_at = NOW()
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(&title)
        .bind(&username)
        .bind(chat_type)
        .bind(&label)
        .bind(&description)
        .bind(chat_id)
        .fetch_one(pool)
        .await?;

        Ok(chat)
    }

    pub async fn delete(pool: &PgPool, chat_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM chats WHERE id = $1")
            .bind(chat_id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Chat {} not found", chat_id)));
        }

        tracing::info!(chat_id = %chat_id, "Chat deleted");
        Ok(())
    }

    /// Destructive bulk delete of every registered chat. Irreversible;
    /// authorization links and audit rows cascade.
    pub async fn clear_all(pool: &PgPool) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM chats").execute(pool).await?;
        tracing::info!(deleted = result.rows_affected(), "All chats cleared");
        Ok(result.rows_affected())
    }

    /// Flip the tester flag and return the updated chat.
    pub async fn toggle_tester(pool: &PgPool, chat_id: Uuid) -> Result<Chat, AppError> {
        let chat: Chat = sqlx::query_as(
            r#"
            UPDATE chats
            SET is_tester = NOT is_tester, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(chat_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Chat {} not found", chat_id)))?;

        Ok(chat)
    }

    /// Register chats found by a discovery sweep, skipping telegram ids that
    /// are already known. Returns how many were new.
    pub async fn upsert_discovered(
        pool: &PgPool,
        discovered: &[DiscoveredChat],
    ) -> Result<usize, AppError> {
        let mut added = 0;

        for chat in discovered {
            let result = sqlx::query(
                r#"
                INSERT INTO chats (id, telegram_id, title, username, chat_type)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (telegram_id) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(chat.telegram_id)
            .bind(&chat.title)
            .bind(&chat.username)
            .bind(chat.chat_type)
            .execute(pool)
            .await?;

            if result.rows_affected() > 0 {
                added += 1;
                tracing::info!(
                    telegram_id = chat.telegram_id,
                    title = %chat.title,
                    "Discovered chat registered"
                );
            }
        }

        Ok(added)
    }
}
