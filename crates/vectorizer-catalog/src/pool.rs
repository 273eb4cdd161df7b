//! Database connection pool management

use crate::error::{CatalogError, CatalogResult};
use sqlx::PgPool;
use vectorizer_config::DatabaseConfig;

/// Create a database connection pool from process configuration.
///
/// # Errors
/// Returns `CatalogError::PoolCreationFailed` if the database is
/// unreachable, credentials are invalid, or the pool cannot be built.
pub async fn create_pool(config: &DatabaseConfig) -> CatalogResult<PgPool> {
    config
        .create_pool()
        .await
        .map_err(|e| CatalogError::ConfigurationError {
            message: e.to_string(),
        })
}
