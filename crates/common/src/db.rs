use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::AppConfig;

/// Create the PostgreSQL connection pool the whole service shares.
///
/// Sizing comes from `AppConfig`: notify dispatches only append audit rows,
/// so the pool is dominated by the admin surface and `db_max_connections`
/// (default 20) is plenty. The short acquire timeout keeps a saturated pool
/// from stalling notify calls indefinitely.
pub async fn create_pool(config: &AppConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&config.database_url)
        .await?;

    tracing::info!(
        max_connections = config.db_max_connections,
        "Connected to PostgreSQL"
    );
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_pool_rejects_malformed_url() {
        let config = AppConfig {
            database_url: "not-a-connection-string".to_string(),
            telegram_bot_token: None,
            jwt_secret: "secret".to_string(),
            jwt_expiry_hours: 24,
            admin_username: "admin".to_string(),
            admin_password_hash: None,
            send_concurrency: 5,
            send_timeout_secs: 30,
            listen_addr: "0.0.0.0:3000".to_string(),
            db_max_connections: 5,
        };

        assert!(create_pool(&config).await.is_err());
    }
}
