//! Fund entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::SchemeCode;

/// A mutual-fund scheme tracked by the service
///
/// Created on first appearance in discovery and refreshed with
/// authoritative upstream metadata on every subsequent ingestion.
/// Never deleted by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fund {
    /// Upstream scheme identifier (primary key)
    pub scheme_code: SchemeCode,
    /// Full scheme name as published upstream
    pub scheme_name: String,
    /// Asset-manager short name (e.g. "Motilal Oswal")
    pub amc: String,
    /// Categorized label (e.g. "Mid Cap Direct Growth")
    pub category: String,
    /// Upstream scheme type (e.g. "Open Ended Schemes"), when known
    pub scheme_type: Option<String>,
    /// Row creation time (set by the store)
    pub created_at: Option<DateTime<Utc>>,
    /// Last metadata refresh time (set by the store)
    pub updated_at: Option<DateTime<Utc>>,
}

impl Fund {
    /// Create a fund as produced by discovery, before it has been persisted
    pub fn discovered(
        scheme_code: SchemeCode,
        scheme_name: impl Into<String>,
        amc: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            scheme_code,
            scheme_name: scheme_name.into(),
            amc: amc.into(),
            category: category.into(),
            scheme_type: None,
            created_at: None,
            updated_at: None,
        }
    }
}
