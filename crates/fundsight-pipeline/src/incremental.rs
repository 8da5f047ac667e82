//! Incremental sync: delta ingestion since the last persisted date
//!
//! Same shape as backfill but scoped to schemes whose backfill has
//! completed. The upstream has no delta endpoint, so the full history is
//! fetched and filtered to strictly newer dates; the filter plus the
//! idempotent upsert make the operation safe even when nothing is new.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing::{error, info, warn};

use fundsight_core::domain::{SchemeCode, SyncState, SyncType};
use fundsight_core::ports::{IFundSource, INavRepository, ISyncStateRepository};

use crate::backfill::is_fatal;
use crate::SchemeAction;

/// Delta ingestion for one scheme at a time
pub struct IncrementalRunner {
    source: Arc<dyn IFundSource>,
    navs: Arc<dyn INavRepository>,
    sync_states: Arc<dyn ISyncStateRepository>,
}

impl IncrementalRunner {
    pub fn new(
        source: Arc<dyn IFundSource>,
        navs: Arc<dyn INavRepository>,
        sync_states: Arc<dyn ISyncStateRepository>,
    ) -> Self {
        Self {
            source,
            navs,
            sync_states,
        }
    }

    /// Incrementally sync one scheme
    ///
    /// Schemes without a completed backfill are skipped without creating an
    /// incremental sync-state row; an incremental delta over an incomplete
    /// base would silently freeze the hole into the history.
    pub async fn process_scheme(&self, scheme_code: &SchemeCode) -> anyhow::Result<SchemeAction> {
        let backfilled = self
            .sync_states
            .get(scheme_code, SyncType::Backfill)
            .await?
            .is_some_and(|s| s.is_completed());
        if !backfilled {
            info!(scheme_code = %scheme_code, "Backfill not completed, skipping incremental");
            return Ok(SchemeAction::Skipped);
        }

        let mut state = self
            .sync_states
            .get(scheme_code, SyncType::Incremental)
            .await?
            .unwrap_or_else(|| SyncState::new(scheme_code.clone(), SyncType::Incremental));
        state.begin(Utc::now());
        self.sync_states
            .upsert(&state)
            .await
            .with_context(|| format!("marking incremental in_progress for {scheme_code}"))?;

        match self.ingest_delta(scheme_code).await {
            Ok(new_records) => {
                let last = self.navs.latest_date(scheme_code).await?;
                state.complete(last, new_records, Utc::now());
                self.sync_states.upsert(&state).await?;
                info!(scheme_code = %scheme_code, new_records, "Incremental sync completed");
                Ok(SchemeAction::Completed {
                    records: new_records,
                })
            }
            Err(e) if is_fatal(&e) => {
                state.fail(format!("{e:#}"), Utc::now());
                self.sync_states.upsert(&state).await?;
                error!(scheme_code = %scheme_code, error = %e, "Fatal ingestion error");
                Err(e)
            }
            Err(e) => {
                let message = format!("{e:#}");
                state.fail(message.clone(), Utc::now());
                self.sync_states.upsert(&state).await?;
                warn!(scheme_code = %scheme_code, error = %message, "Incremental sync failed");
                Ok(SchemeAction::Failed { error: message })
            }
        }
    }

    /// Fetch and persist only dates strictly newer than the stored maximum
    async fn ingest_delta(&self, scheme_code: &SchemeCode) -> anyhow::Result<u64> {
        let latest = self.navs.latest_date(scheme_code).await?;

        let history = self
            .source
            .fetch_scheme(scheme_code)
            .await
            .with_context(|| format!("fetching history for {scheme_code}"))?;

        let fresh: Vec<_> = match latest {
            Some(latest) => history
                .points
                .into_iter()
                .filter(|p| p.date > latest)
                .collect(),
            None => history.points,
        };

        let count = fresh.len() as u64;
        if fresh.is_empty() {
            info!(scheme_code = %scheme_code, "No new NAV rows upstream");
        } else {
            self.navs
                .upsert_points(scheme_code, &fresh)
                .await
                .with_context(|| format!("upserting delta for {scheme_code}"))?;
        }
        Ok(count)
    }
}
