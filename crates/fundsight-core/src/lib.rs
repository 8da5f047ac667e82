//! Fundsight Core - domain model and port definitions
//!
//! Dependency-light hub of the workspace. Defines:
//! - Domain entities and value types (funds, NAV points, sync state,
//!   pipeline status, analytics windows)
//! - Environment-driven configuration with validation
//! - Async port traits implemented by the adapter crates

pub mod config;
pub mod domain;
pub mod ports;
