//! Backfill: full-history ingestion for discovered schemes
//!
//! Schemes are processed sequentially. With a handful of schemes and a
//! 300-requests-per-hour ceiling, parallelism buys no throughput and would
//! complicate limiter accounting.
//!
//! Resume semantics live entirely in the sync-state rows: a scheme whose
//! backfill row is `completed` is skipped; `pending`, `failed`, and
//! `in_progress` (interrupted) schemes are reprocessed from scratch, which
//! the idempotent NAV upsert makes safe.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing::{error, info, warn};

use fundsight_core::domain::{Fund, SyncState, SyncType};
use fundsight_core::ports::{IFundRepository, IFundSource, INavRepository, ISyncStateRepository};
use fundsight_mfapi::MfapiError;

use crate::SchemeAction;

/// Whether an ingestion error must abort the whole run
///
/// An upstream 429 means the limiter is miscalibrated; continuing would
/// hammer an already-breached quota, so it is fatal rather than a
/// per-scheme failure.
pub(crate) fn is_fatal(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<MfapiError>(),
        Some(MfapiError::RateLimitBreach)
    )
}

/// Full-history ingestion for one scheme at a time
pub struct BackfillRunner {
    source: Arc<dyn IFundSource>,
    funds: Arc<dyn IFundRepository>,
    navs: Arc<dyn INavRepository>,
    sync_states: Arc<dyn ISyncStateRepository>,
}

impl BackfillRunner {
    pub fn new(
        source: Arc<dyn IFundSource>,
        funds: Arc<dyn IFundRepository>,
        navs: Arc<dyn INavRepository>,
        sync_states: Arc<dyn ISyncStateRepository>,
    ) -> Self {
        Self {
            source,
            funds,
            navs,
            sync_states,
        }
    }

    /// Backfill one discovered scheme
    ///
    /// Returns `Err` only for fatal conditions (rate-limit breach, store
    /// loss while recording state); ordinary upstream failures are recorded
    /// on the sync-state row and reported as [`SchemeAction::Failed`].
    pub async fn process_scheme(&self, fund: &Fund) -> anyhow::Result<SchemeAction> {
        let code = &fund.scheme_code;

        // The fund row must exist before any child row can reference it
        self.funds
            .upsert(fund)
            .await
            .with_context(|| format!("ensuring fund row for {code}"))?;

        let mut state = match self.sync_states.get(code, SyncType::Backfill).await? {
            Some(state) if state.is_completed() => {
                info!(scheme_code = %code, "Backfill already completed, skipping");
                return Ok(SchemeAction::Skipped);
            }
            Some(state) => state,
            None => SyncState::new(code.clone(), SyncType::Backfill),
        };

        state.begin(Utc::now());
        self.sync_states
            .upsert(&state)
            .await
            .with_context(|| format!("marking backfill in_progress for {code}"))?;

        match self.ingest(fund).await {
            Ok(records) => {
                let last = self.navs.latest_date(code).await?;
                state.complete(last, records, Utc::now());
                self.sync_states.upsert(&state).await?;
                info!(scheme_code = %code, records, "Backfill completed");
                Ok(SchemeAction::Completed { records })
            }
            Err(e) if is_fatal(&e) => {
                state.fail(format!("{e:#}"), Utc::now());
                self.sync_states.upsert(&state).await?;
                error!(scheme_code = %code, error = %e, "Fatal ingestion error");
                Err(e)
            }
            Err(e) => {
                let message = format!("{e:#}");
                state.fail(message.clone(), Utc::now());
                self.sync_states.upsert(&state).await?;
                warn!(scheme_code = %code, error = %message, "Backfill failed");
                Ok(SchemeAction::Failed { error: message })
            }
        }
    }

    /// Fetch, refresh metadata, and upsert the full history
    async fn ingest(&self, fund: &Fund) -> anyhow::Result<u64> {
        let code = &fund.scheme_code;
        let history = self
            .source
            .fetch_scheme(code)
            .await
            .with_context(|| format!("fetching history for {code}"))?;

        // Refresh metadata with authoritative upstream values, keeping the
        // discovery-derived AMC label and category.
        let refreshed = Fund {
            scheme_code: code.clone(),
            scheme_name: history.meta.scheme_name.clone(),
            amc: fund.amc.clone(),
            category: fund.category.clone(),
            scheme_type: history.meta.scheme_type.clone(),
            created_at: None,
            updated_at: None,
        };
        self.funds
            .upsert(&refreshed)
            .await
            .with_context(|| format!("refreshing fund metadata for {code}"))?;

        let records = history.points.len() as u64;
        self.navs
            .upsert_points(code, &history.points)
            .await
            .with_context(|| format!("upserting NAV history for {code}"))?;
        Ok(records)
    }
}
