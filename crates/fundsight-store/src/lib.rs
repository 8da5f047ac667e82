//! Fundsight Store - MySQL persistence
//!
//! Concrete implementations of the repository ports over a shared MySQL
//! pool:
//! - [`funds`] - fund metadata (insert-or-refresh)
//! - [`navs`] - NAV history (idempotent bulk upsert, range/latest queries)
//! - [`sync_state`] - per-scheme sync progress
//! - [`pipeline`] - the singleton pipeline status row
//! - [`analytics`] - precomputed analytics rows and ranking queries
//!
//! The schema is bootstrapped from an embedded DDL file on connection; all
//! statements are idempotent so repeated startups are harmless.

pub mod analytics;
pub mod funds;
pub mod navs;
pub mod pipeline;
pub mod pool;
pub mod sync_state;

use thiserror::Error;

pub use analytics::MySqlAnalyticsRepository;
pub use funds::MySqlFundRepository;
pub use navs::MySqlNavRepository;
pub use pipeline::MySqlPipelineStatusRepository;
pub use pool::DatabasePool;
pub use sync_state::MySqlSyncStateRepository;

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum StoreError {
    /// The pool could not be established
    #[error("database connection failed: {0}")]
    ConnectionFailed(String),

    /// The embedded schema bootstrap failed
    #[error("schema bootstrap failed: {0}")]
    MigrationFailed(String),

    /// A stored value did not map back onto its domain type
    #[error("row mapping failed: {0}")]
    Mapping(String),

    /// Any other driver error
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
