//! Database connection pool management
//!
//! Wraps SQLx's MySQL pool with:
//! - Bounded connections (configuration-driven, default 10)
//! - Automatic schema bootstrap on first connection

use sqlx::mysql::{MySqlPool, MySqlPoolOptions};

use fundsight_core::config::DatabaseConfig;

use crate::StoreError;

/// Manages the MySQL connection pool shared by the API and the pipeline
pub struct DatabasePool {
    pool: MySqlPool,
}

impl DatabasePool {
    /// Connect and bootstrap the schema
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ConnectionFailed`] if the pool cannot be
    /// established, or [`StoreError::MigrationFailed`] if the schema
    /// bootstrap fails.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.connect_url())
            .await
            .map_err(|e| {
                StoreError::ConnectionFailed(format!(
                    "failed to connect to {}:{}/{}: {e}",
                    config.host, config.port, config.database
                ))
            })?;

        Self::run_migrations(&pool).await?;

        tracing::info!(
            host = %config.host,
            database = %config.database,
            max_connections = config.max_connections,
            "Database pool initialized"
        );

        Ok(Self { pool })
    }

    /// Returns a reference to the underlying pool
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Runs the embedded schema bootstrap
    async fn run_migrations(pool: &MySqlPool) -> Result<(), StoreError> {
        let migration_sql = include_str!("migrations/0001_schema.sql");
        sqlx::raw_sql(migration_sql)
            .execute(pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("schema bootstrap failed: {e}")))?;

        tracing::debug!("Schema bootstrap completed");
        Ok(())
    }
}
