//! Pipeline orchestrator
//!
//! Owns the process-wide run slot and the durable pipeline-status row, and
//! sequences the phases:
//!
//! - full:        discovery → backfill → analytics
//! - incremental: incremental sync → analytics (skipped when nothing new)
//!
//! The in-process flag resolves same-process races; the durable row
//! resolves cross-restart ambiguity (a `running` row found at boot means
//! the previous run was interrupted and is reset to idle, after which
//! per-scheme resume does the rest).

use std::sync::{Arc, Mutex};

use anyhow::Context;
use chrono::Utc;
use tracing::{error, info, warn};

use fundsight_analytics::AnalyticsEngine;
use fundsight_core::domain::{PipelinePhase, SchemeCode};
use fundsight_core::ports::{
    FundFilter, IAnalyticsRepository, IFundRepository, IFundSource, INavRepository,
    IPipelineStatusRepository, ISyncStateRepository,
};

use crate::backfill::BackfillRunner;
use crate::discovery;
use crate::incremental::IncrementalRunner;
use crate::{PipelineError, SchemeAction, SyncMode};

/// Progress boundary after discovery (full run)
const DISCOVERY_END: f64 = 10.0;
/// Progress boundary after backfill / incremental sync
const SYNC_END: f64 = 70.0;

/// Linear interpolation of progress within a phase
fn phase_progress(base: f64, end: f64, done: usize, total: usize) -> f64 {
    if total == 0 {
        return end;
    }
    base + (end - base) * done as f64 / total as f64
}

/// Sequences pipeline runs and reports progress
pub struct PipelineOrchestrator {
    source: Arc<dyn IFundSource>,
    funds: Arc<dyn IFundRepository>,
    status: Arc<dyn IPipelineStatusRepository>,
    backfill: BackfillRunner,
    incremental: IncrementalRunner,
    analytics: AnalyticsEngine,
    /// Process-wide run slot; the durable status row is the cross-restart half
    running: Mutex<bool>,
}

impl PipelineOrchestrator {
    pub fn new(
        source: Arc<dyn IFundSource>,
        funds: Arc<dyn IFundRepository>,
        navs: Arc<dyn INavRepository>,
        sync_states: Arc<dyn ISyncStateRepository>,
        analytics_repo: Arc<dyn IAnalyticsRepository>,
        status: Arc<dyn IPipelineStatusRepository>,
    ) -> Self {
        Self {
            backfill: BackfillRunner::new(
                Arc::clone(&source),
                Arc::clone(&funds),
                Arc::clone(&navs),
                Arc::clone(&sync_states),
            ),
            incremental: IncrementalRunner::new(
                Arc::clone(&source),
                Arc::clone(&navs),
                Arc::clone(&sync_states),
            ),
            analytics: AnalyticsEngine::new(navs, analytics_repo),
            source,
            funds,
            status,
            running: Mutex::new(false),
        }
    }

    /// Whether a run currently holds the slot in this process
    pub fn is_running(&self) -> bool {
        *self.running.lock().unwrap()
    }

    /// Reset a `running` status row left behind by an interrupted process
    ///
    /// Called once at startup, before the trigger surface opens. Scheme
    /// counters from the interrupted run are preserved for post-mortems.
    pub async fn recover_interrupted(&self) -> anyhow::Result<()> {
        let mut status = self.status.get().await?;
        if status.is_interrupted() {
            warn!(
                phase = ?status.current_phase,
                progress = status.progress_percent,
                "Previous pipeline run was interrupted, resetting to idle"
            );
            status.state = fundsight_core::domain::PipelineState::Idle;
            status.current_phase = None;
            status.completed_at = Some(Utc::now());
            self.status.save(&status).await?;
        }
        Ok(())
    }

    /// Start a run in the background
    ///
    /// Takes a clone of the shared handle and returns immediately: `Ok`
    /// when the slot was acquired and the run was spawned,
    /// [`PipelineError::AlreadyRunning`] when another run holds it (the
    /// control plane maps this to 409).
    pub fn try_start(self: Arc<Self>, mode: SyncMode) -> Result<(), PipelineError> {
        self.acquire_slot()?;
        info!(mode = mode.as_str(), "Pipeline run starting");

        tokio::spawn(async move {
            if let Err(e) = self.execute_and_record(mode).await {
                error!(mode = mode.as_str(), error = %format!("{e:#}"), "Pipeline run failed");
            }
            self.release_slot();
        });
        Ok(())
    }

    /// Run to completion on the caller's task (scheduler and tests)
    pub async fn run(&self, mode: SyncMode) -> Result<(), PipelineError> {
        self.acquire_slot()?;
        let result = self.execute_and_record(mode).await;
        self.release_slot();
        result.map_err(PipelineError::Other)
    }

    fn acquire_slot(&self) -> Result<(), PipelineError> {
        let mut running = self.running.lock().unwrap();
        if *running {
            return Err(PipelineError::AlreadyRunning);
        }
        *running = true;
        Ok(())
    }

    fn release_slot(&self) {
        *self.running.lock().unwrap() = false;
    }

    /// Execute the run; on failure, record the error on the status row
    async fn execute_and_record(&self, mode: SyncMode) -> anyhow::Result<()> {
        let result = match mode {
            SyncMode::Full => self.run_full().await,
            SyncMode::Incremental => self.run_incremental().await,
        };

        if let Err(ref e) = result {
            match self.status.get().await {
                Ok(mut status) => {
                    status.fail(format!("{e:#}"), Utc::now());
                    if let Err(save_err) = self.status.save(&status).await {
                        error!(error = %save_err, "Failed to record pipeline failure");
                    }
                }
                Err(read_err) => {
                    error!(error = %read_err, "Failed to read pipeline status after failure");
                }
            }
        }
        result
    }

    /// discovery (0-10%) → backfill (10-70%) → analytics (70-100%)
    async fn run_full(&self) -> anyhow::Result<()> {
        let mut status = self.status.get().await?;
        status.start(PipelinePhase::Discovery, Utc::now());
        self.status.save(&status).await?;

        let catalog = self
            .source
            .list_schemes()
            .await
            .context("listing upstream catalog")?;
        let discovered = discovery::filter_catalog(&catalog);
        let total = discovered.len();

        status.total_schemes = total as u32;
        status.current_phase = Some(PipelinePhase::Backfill);
        status.progress_percent = DISCOVERY_END;
        self.status.save(&status).await?;

        for (i, fund) in discovered.iter().enumerate() {
            match self.backfill.process_scheme(fund).await? {
                SchemeAction::Failed { .. } => status.failed_schemes += 1,
                SchemeAction::Completed { .. } | SchemeAction::Skipped => {
                    status.completed_schemes += 1;
                }
            }
            status.progress_percent = phase_progress(DISCOVERY_END, SYNC_END, i + 1, total);
            self.status.save(&status).await?;
        }

        status.current_phase = Some(PipelinePhase::Analytics);
        status.progress_percent = SYNC_END;
        self.status.save(&status).await?;

        for (i, fund) in discovered.iter().enumerate() {
            self.analytics.recompute_scheme(&fund.scheme_code).await?;
            status.progress_percent = phase_progress(SYNC_END, 100.0, i + 1, total);
            self.status.save(&status).await?;
        }

        status.finish(Utc::now());
        self.status.save(&status).await?;
        info!(
            total,
            failed = status.failed_schemes,
            "Full pipeline run finished"
        );
        Ok(())
    }

    /// incremental sync (0-70%) → analytics (70-100%, only touched schemes)
    async fn run_incremental(&self) -> anyhow::Result<()> {
        let mut status = self.status.get().await?;
        status.start(PipelinePhase::Incremental, Utc::now());
        self.status.save(&status).await?;

        let funds = self.funds.list(&FundFilter::default()).await?;
        let total = funds.len();
        status.total_schemes = total as u32;
        self.status.save(&status).await?;

        let mut touched: Vec<SchemeCode> = Vec::new();
        for (i, fund) in funds.iter().enumerate() {
            match self.incremental.process_scheme(&fund.scheme_code).await? {
                SchemeAction::Completed { records } => {
                    status.completed_schemes += 1;
                    if records > 0 {
                        touched.push(fund.scheme_code.clone());
                    }
                }
                SchemeAction::Failed { .. } => status.failed_schemes += 1,
                SchemeAction::Skipped => {}
            }
            status.progress_percent = phase_progress(0.0, SYNC_END, i + 1, total);
            self.status.save(&status).await?;
        }

        if touched.is_empty() {
            info!("No scheme gained rows, skipping analytics");
        } else {
            status.current_phase = Some(PipelinePhase::Analytics);
            status.progress_percent = SYNC_END;
            self.status.save(&status).await?;

            for (i, code) in touched.iter().enumerate() {
                self.analytics.recompute_scheme(code).await?;
                status.progress_percent = phase_progress(SYNC_END, 100.0, i + 1, touched.len());
                self.status.save(&status).await?;
            }
        }

        status.finish(Utc::now());
        self.status.save(&status).await?;
        info!(
            total,
            updated = touched.len(),
            failed = status.failed_schemes,
            "Incremental pipeline run finished"
        );
        Ok(())
    }
}
