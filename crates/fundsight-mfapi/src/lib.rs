//! Fundsight MFAPI - upstream NAV API client
//!
//! Async client for the public mutual-fund NAV API:
//! - Full scheme catalog (`GET {base}/`)
//! - Per-scheme metadata and NAV history (`GET {base}/{scheme_code}`)
//!
//! Every request gates on the shared rate limiter before touching the
//! network. Responses are normalized at this boundary: upstream
//! `DD-MM-YYYY` dates become ISO calendar dates, NAV strings become
//! fixed-point decimals, and the newest-first history is reversed so
//! downstream only ever sees ascending-by-date series.
//!
//! ## Modules
//!
//! - [`client`] - the HTTP client
//! - [`model`] - raw upstream payload shapes and normalization

pub mod client;
pub mod model;

use thiserror::Error;

pub use client::MfapiClient;

/// Errors that can occur when talking to the upstream NAV API
#[derive(Debug, Error)]
pub enum MfapiError {
    /// The upstream returned HTTP 429
    ///
    /// A 429 despite the limiter gate means the limiter is miscalibrated
    /// against the real upstream quota. Never retried here; the pipeline
    /// surfaces it as a run failure.
    #[error("upstream rate limit breached (HTTP 429): limiter is miscalibrated")]
    RateLimitBreach,

    /// Any other non-success status (5xx, 404, ...)
    #[error("upstream returned HTTP {status} for {path}")]
    Status {
        /// The response status code
        status: u16,
        /// Request path relative to the base URL
        path: String,
    },

    /// Transport-level failure (connect, timeout, TLS, body read)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body did not match the documented shape
    #[error("malformed upstream payload: {0}")]
    Malformed(String),

    /// Waiting for a rate-limit token failed
    #[error(transparent)]
    Limiter(#[from] fundsight_limiter::LimiterError),
}
