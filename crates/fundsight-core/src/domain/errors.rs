//! Domain error types

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Scheme code failed validation (empty, too long, or non-alphanumeric)
    #[error("Invalid scheme code: {0}")]
    InvalidSchemeCode(String),

    /// A string did not parse to a known enum value
    #[error("Unknown {kind}: {value}")]
    UnknownVariant {
        /// What was being parsed (e.g. "sync status")
        kind: &'static str,
        /// The offending input
        value: String,
    },

    /// Invalid state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },
}
