//! Shared application state for the Axum API server.

use std::sync::Arc;

use sqlx::PgPool;

use herald_common::config::AppConfig;
use herald_engine::transport::MessageTransport;

/// Application state shared across all route handlers via Axum `State`.
///
/// `transport` is `None` when no bot token is configured; the dispatch
/// endpoints then answer 500 without side effects.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: AppConfig,
    pub transport: Option<Arc<dyn MessageTransport>>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: AppConfig,
        transport: Option<Arc<dyn MessageTransport>>,
    ) -> Self {
        Self {
            pool,
            config,
            transport,
        }
    }

    /// The transport, or the operator-caused configuration error.
    pub fn require_transport(&self) -> Result<Arc<dyn MessageTransport>, herald_common::error::AppError> {
        self.transport
            .clone()
            .ok_or_else(|| herald_common::error::AppError::Config("Bot not configured".to_string()))
    }
}
