//! Service registry: admin CRUD for API clients and their chat
//! authorizations.

use rand::Rng;
use rand::distributions::Alphanumeric;
use sqlx::PgPool;
use uuid::Uuid;

use herald_common::error::{AppError, conflict_on_unique, invalid_reference_on_fk};
use herald_common::types::{Chat, Service};

/// Length of generated API keys. Existing keys never rotate, so changing
/// this only affects new issuance.
const API_KEY_LENGTH: usize = 32;

pub struct ServiceRegistry;

/// Parameters for registering a new service.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CreateServiceParams {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
}

/// Parameters for updating service details. The API key is immutable and
/// deliberately absent here.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct UpdateServiceParams {
    pub name: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
}

/// Generate an opaque alphanumeric API key.
pub fn generate_api_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(API_KEY_LENGTH)
        .map(char::from)
        .collect()
}

impl ServiceRegistry {
    /// Register a new service and issue its API key.
    pub async fn create(pool: &PgPool, params: &CreateServiceParams) -> Result<Service, AppError> {
        let name = params.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Service name is required".to_string()));
        }

        let service: Service = sqlx::query_as(
            r#"
            INSERT INTO services (id, name, label, description, api_key)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(&params.label)
        .bind(&params.description)
        .bind(generate_api_key())
        .fetch_one(pool)
        .await
        .map_err(|e| conflict_on_unique(e, "A service with this name already exists"))?;

        tracing::info!(service_id = %service.id, name = %service.name, "Service registered");
        Ok(service)
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Service>, AppError> {
        let services: Vec<Service> = sqlx::query_as("SELECT * FROM services ORDER BY name")
            .fetch_all(pool)
            .await?;
        Ok(services)
    }

    pub async fn get(pool: &PgPool, service_id: Uuid) -> Result<Service, AppError> {
        let service: Service = sqlx::query_as("SELECT * FROM services WHERE id = $1")
            .bind(service_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Service {} not found", service_id)))?;
        Ok(service)
    }

    /// Update name/label/description. Omitted fields keep their value.
    pub async fn update_details(
        pool: &PgPool,
        service_id: Uuid,
        params: &UpdateServiceParams,
    ) -> Result<Service, AppError> {
        let existing = Self::get(pool, service_id).await?;

        let name = match &params.name {
            Some(name) if name.trim().is_empty() => {
                return Err(AppError::Validation("Service name is required".to_string()));
            }
            Some(name) => name.trim().to_string(),
            None => existing.name,
        };
        let label = params.label.clone().or(existing.label);
        let description = params.description.clone().or(existing.description);

        let service: Service = sqlx::query_as(
            r#"
            UPDATE services
            SET name = $1, label = $2, description = $3, updated_at = NOW()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(&name)
        .bind(&label)
        .bind(&description)
        .bind(service_id)
        .fetch_one(pool)
        .await
        .map_err(|e| conflict_on_unique(e, "A service with this name already exists"))?;

        Ok(service)
    }

    /// Delete a service; authorization links and audit rows cascade.
    pub async fn delete(pool: &PgPool, service_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM services WHERE id = $1")
            .bind(service_id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Service {} not found",
                service_id
            )));
        }

        tracing::info!(service_id = %service_id, "Service deleted");
        Ok(())
    }

    /// Replace the set of chats this service may notify.
    pub async fn set_authorized_chats(
        pool: &PgPool,
        service_id: Uuid,
        chat_ids: &[Uuid],
    ) -> Result<Vec<Chat>, AppError> {
        // Existence check up front so a bogus id is a 404, not a silent no-op.
        Self::get(pool, service_id).await?;

        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM service_chats WHERE service_id = $1")
            .bind(service_id)
            .execute(&mut *tx)
            .await?;

        for chat_id in chat_ids {
            sqlx::query(
                "INSERT INTO service_chats (service_id, chat_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(service_id)
            .bind(chat_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| invalid_reference_on_fk(e, "One or more chat ids are unknown"))?;
        }

        tx.commit().await?;

        tracing::info!(
            service_id = %service_id,
            chats = chat_ids.len(),
            "Authorized chats replaced"
        );

        Self::authorized_chats(pool, service_id).await
    }

    /// Look up a service by its API key.
    pub async fn find_by_api_key(pool: &PgPool, api_key: &str) -> Result<Option<Service>, AppError> {
        let service: Option<Service> = sqlx::query_as("SELECT * FROM services WHERE api_key = $1")
            .bind(api_key)
            .fetch_optional(pool)
            .await?;
        Ok(service)
    }

    /// The chats a service is authorized to notify, in a stable order
    /// (title, then telegram id) independent of link insertion order.
    pub async fn authorized_chats(pool: &PgPool, service_id: Uuid) -> Result<Vec<Chat>, AppError> {
        let chats: Vec<Chat> = sqlx::query_as(
            r#"
            SELECT c.*
            FROM chats c
            JOIN service_chats sc ON sc.chat_id = c.id
            WHERE sc.service_id = $1
            ORDER BY c.title, c.telegram_id
            "#,
        )
        .bind(service_id)
        .fetch_all(pool)
        .await?;
        Ok(chats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_shape() {
        let key = generate_api_key();
        assert_eq!(key.len(), API_KEY_LENGTH);
        assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_api_keys_are_unique() {
        assert_ne!(generate_api_key(), generate_api_key());
    }
}
