//! Upstream fund source port (driven/secondary port)
//!
//! Interface to the public NAV API. The concrete implementation normalizes
//! upstream payloads (date format, value parsing, ordering) so that
//! everything behind this port sees clean ascending-by-date history.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are
//!   adapter-specific; callers downcast when they need the distinction
//!   (e.g. the fatal rate-limit breach).
//! - The DTOs here are port-level types, not domain entities; the pipeline
//!   maps them onto [`Fund`](crate::domain::Fund) rows.

use serde::{Deserialize, Serialize};

use crate::domain::{NavPoint, SchemeCode};

/// One entry of the full upstream catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub scheme_code: SchemeCode,
    pub scheme_name: String,
}

/// Authoritative scheme metadata returned alongside history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeMeta {
    pub scheme_code: SchemeCode,
    pub scheme_name: String,
    /// Upstream name of the issuing asset manager
    pub fund_house: String,
    pub scheme_type: Option<String>,
    pub scheme_category: Option<String>,
}

/// Full normalized history for one scheme
///
/// `points` is ascending by date with at most one entry per calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeHistory {
    pub meta: SchemeMeta,
    pub points: Vec<NavPoint>,
}

impl SchemeHistory {
    /// The newest NAV date in the history, if any
    #[must_use]
    pub fn last_date(&self) -> Option<chrono::NaiveDate> {
        self.points.last().map(|p| p.date)
    }
}

/// Port trait for the upstream NAV API
///
/// Implementations gate every request on the shared rate limiter before
/// touching the network.
#[async_trait::async_trait]
pub trait IFundSource: Send + Sync {
    /// Fetch the full scheme catalog
    ///
    /// # Returns
    /// Every scheme the upstream knows about, in upstream order.
    async fn list_schemes(&self) -> anyhow::Result<Vec<CatalogEntry>>;

    /// Fetch metadata and full NAV history for one scheme
    ///
    /// # Arguments
    /// * `scheme_code` - The upstream scheme identifier
    async fn fetch_scheme(&self, scheme_code: &SchemeCode) -> anyhow::Result<SchemeHistory>;
}
