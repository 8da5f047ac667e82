//! Per-scheme synchronization state
//!
//! Each scheme carries one durable state row per sync phase (backfill,
//! incremental). The row records where the phase got to so an interrupted
//! run can resume: `completed` schemes are skipped, everything else is
//! reprocessed from scratch under the idempotent NAV upsert.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::SchemeCode;

/// Which ingestion phase a sync-state row tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncType {
    /// Full-history fetch for a newly discovered scheme
    Backfill,
    /// Delta fetch of dates newer than the last persisted one
    Incremental,
}

impl SyncType {
    /// Stable string form used in storage and API payloads
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backfill => "backfill",
            Self::Incremental => "incremental",
        }
    }
}

impl Display for SyncType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backfill" => Ok(Self::Backfill),
            "incremental" => Ok(Self::Incremental),
            other => Err(DomainError::UnknownVariant {
                kind: "sync type",
                value: other.to_string(),
            }),
        }
    }
}

/// Lifecycle status of a sync-state row
///
/// Transitions: `pending → in_progress → (completed | failed)`.
/// A row may re-enter `in_progress` when the scheme is reprocessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl SyncStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl Display for SyncStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(DomainError::UnknownVariant {
                kind: "sync status",
                value: other.to_string(),
            }),
        }
    }
}

/// Durable progress record for one `(scheme, sync_type)` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    pub scheme_code: SchemeCode,
    pub sync_type: SyncType,
    pub status: SyncStatus,
    /// Newest NAV date persisted by the last successful run
    pub last_synced_date: Option<NaiveDate>,
    /// Number of history records seen by the last successful run
    pub total_records: u64,
    /// Failure message from the last failed run, cleared on restart
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SyncState {
    /// Create a fresh `pending` row, as written lazily on first processing
    pub fn new(scheme_code: SchemeCode, sync_type: SyncType) -> Self {
        Self {
            scheme_code,
            sync_type,
            status: SyncStatus::Pending,
            last_synced_date: None,
            total_records: 0,
            error_message: None,
            started_at: None,
            completed_at: None,
        }
    }

    /// Mark the row `in_progress`, clearing any previous error
    pub fn begin(&mut self, now: DateTime<Utc>) {
        self.status = SyncStatus::InProgress;
        self.error_message = None;
        self.started_at = Some(now);
        self.completed_at = None;
    }

    /// Mark the row `completed` with the run's high-water mark
    pub fn complete(
        &mut self,
        last_synced_date: Option<NaiveDate>,
        total_records: u64,
        now: DateTime<Utc>,
    ) {
        self.status = SyncStatus::Completed;
        self.last_synced_date = last_synced_date;
        self.total_records = total_records;
        self.error_message = None;
        self.completed_at = Some(now);
    }

    /// Mark the row `failed` with the error message
    pub fn fail(&mut self, message: impl Into<String>, now: DateTime<Utc>) {
        self.status = SyncStatus::Failed;
        self.error_message = Some(message.into());
        self.completed_at = Some(now);
    }

    /// Whether the phase finished successfully for this scheme
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == SyncStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code() -> SchemeCode {
        SchemeCode::new("127042").unwrap()
    }

    #[test]
    fn new_row_is_pending() {
        let state = SyncState::new(code(), SyncType::Backfill);
        assert_eq!(state.status, SyncStatus::Pending);
        assert!(state.last_synced_date.is_none());
        assert_eq!(state.total_records, 0);
    }

    #[test]
    fn begin_clears_previous_error() {
        let mut state = SyncState::new(code(), SyncType::Backfill);
        let now = Utc::now();
        state.fail("upstream timed out", now);
        assert_eq!(state.status, SyncStatus::Failed);

        state.begin(now);
        assert_eq!(state.status, SyncStatus::InProgress);
        assert!(state.error_message.is_none());
        assert!(state.completed_at.is_none());
    }

    #[test]
    fn complete_records_high_water_mark() {
        let mut state = SyncState::new(code(), SyncType::Backfill);
        let now = Utc::now();
        state.begin(now);

        let last = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        state.complete(Some(last), 2481, now);

        assert!(state.is_completed());
        assert_eq!(state.last_synced_date, Some(last));
        assert_eq!(state.total_records, 2481);
        assert!(state.completed_at.is_some());
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            SyncStatus::Pending,
            SyncStatus::InProgress,
            SyncStatus::Completed,
            SyncStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<SyncStatus>().unwrap(), status);
        }
        assert!("done".parse::<SyncStatus>().is_err());
    }

    #[test]
    fn sync_type_round_trips_through_strings() {
        assert_eq!("backfill".parse::<SyncType>().unwrap(), SyncType::Backfill);
        assert_eq!(
            "incremental".parse::<SyncType>().unwrap(),
            SyncType::Incremental
        );
        assert!("full".parse::<SyncType>().is_err());
    }
}
