//! Persistence ports (driven/secondary ports)
//!
//! One trait per relation, kept narrow so test doubles stay small. All
//! write operations are idempotent upserts: re-applying a write leaves the
//! store in the same state as applying it once.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::domain::{
    AnalyticsRow, Fund, NavPoint, PipelineStatus, SchemeCode, SyncState, SyncType, Window,
};

/// Case-insensitive substring filters for the fund listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FundFilter {
    pub category: Option<String>,
    pub amc: Option<String>,
}

/// Fund metadata persistence
#[async_trait::async_trait]
pub trait IFundRepository: Send + Sync {
    /// Insert the fund or refresh its metadata if the row already exists
    async fn upsert(&self, fund: &Fund) -> anyhow::Result<()>;

    async fn get(&self, scheme_code: &SchemeCode) -> anyhow::Result<Option<Fund>>;

    /// List funds matching the filter, ordered by scheme name
    async fn list(&self, filter: &FundFilter) -> anyhow::Result<Vec<Fund>>;
}

/// NAV history persistence
#[async_trait::async_trait]
pub trait INavRepository: Send + Sync {
    /// Bulk-upsert NAV points for a scheme
    ///
    /// Duplicate `(scheme, date)` rows overwrite the stored NAV. Returns
    /// the number of points written.
    async fn upsert_points(
        &self,
        scheme_code: &SchemeCode,
        points: &[NavPoint],
    ) -> anyhow::Result<u64>;

    /// The newest persisted NAV date for a scheme
    async fn latest_date(&self, scheme_code: &SchemeCode) -> anyhow::Result<Option<NaiveDate>>;

    /// The newest persisted NAV point for a scheme
    async fn latest_point(&self, scheme_code: &SchemeCode) -> anyhow::Result<Option<NavPoint>>;

    /// Full history for a scheme, ascending by date
    async fn series(&self, scheme_code: &SchemeCode) -> anyhow::Result<Vec<NavPoint>>;
}

/// Per-scheme sync progress persistence
#[async_trait::async_trait]
pub trait ISyncStateRepository: Send + Sync {
    async fn get(
        &self,
        scheme_code: &SchemeCode,
        sync_type: SyncType,
    ) -> anyhow::Result<Option<SyncState>>;

    /// Insert or replace the row for `(scheme, sync_type)`
    async fn upsert(&self, state: &SyncState) -> anyhow::Result<()>;

    /// Histogram of row statuses for one sync type, keyed by status string
    async fn counts_by_status(&self, sync_type: SyncType)
        -> anyhow::Result<HashMap<String, u64>>;
}

/// Singleton pipeline status persistence
#[async_trait::async_trait]
pub trait IPipelineStatusRepository: Send + Sync {
    /// Read the singleton row, falling back to idle when absent
    async fn get(&self) -> anyhow::Result<PipelineStatus>;

    /// Replace the singleton row
    async fn save(&self, status: &PipelineStatus) -> anyhow::Result<()>;
}

/// Which analytics column a ranking sorts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankMetric {
    /// Median rolling return, best first (descending)
    MedianReturn,
    /// Max drawdown, shallowest first (ascending; values are ≤ 0)
    MaxDrawdown,
}

impl RankMetric {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MedianReturn => "median_return",
            Self::MaxDrawdown => "max_drawdown",
        }
    }
}

/// Parameters of a fund ranking query
#[derive(Debug, Clone)]
pub struct RankQuery {
    pub category: Option<String>,
    pub window: Window,
    pub sort_by: RankMetric,
    pub limit: u32,
}

/// One ranking result: the fund joined with its analytics row
#[derive(Debug, Clone)]
pub struct RankedFund {
    pub fund: Fund,
    pub analytics: AnalyticsRow,
}

/// Precomputed analytics persistence
#[async_trait::async_trait]
pub trait IAnalyticsRepository: Send + Sync {
    /// Insert or replace the row for `(scheme, window)`
    async fn upsert(&self, row: &AnalyticsRow) -> anyhow::Result<()>;

    async fn get(
        &self,
        scheme_code: &SchemeCode,
        window: Window,
    ) -> anyhow::Result<Option<AnalyticsRow>>;

    /// Remove the row for `(scheme, window)`, if present
    ///
    /// Used when a recomputation finds the scheme no longer has sufficient
    /// history for a window it previously had a row for.
    async fn delete(&self, scheme_code: &SchemeCode, window: Window) -> anyhow::Result<()>;

    /// Rank funds by an analytics metric within an optional category
    ///
    /// Ordering: descending for returns, ascending for drawdown, ties
    /// broken by scheme code ascending.
    async fn rank(&self, query: &RankQuery) -> anyhow::Result<Vec<RankedFund>>;
}
