//! Scheduled sync trigger
//!
//! Background task that fires an incremental pipeline run on the configured
//! cron schedule, evaluated in IST (the upstream publishes NAVs on the
//! Indian trading calendar). A fire that collides with a manual run is
//! logged and dropped; the next fire catches up.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{FixedOffset, Utc};
use cron::Schedule;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use fundsight_pipeline::{PipelineError, PipelineOrchestrator, SyncMode};

/// IST is UTC+05:30, with no daylight saving to worry about
const IST_OFFSET_SECS: i32 = 5 * 3600 + 1800;

/// The `cron` crate wants a seconds field; standard five-field expressions
/// get one prepended so `0 6 * * *` means 06:00:00.
fn normalize_expression(expr: &str) -> String {
    if expr.split_whitespace().count() == 5 {
        format!("0 {expr}")
    } else {
        expr.to_string()
    }
}

/// Fires incremental syncs on a cron schedule
pub struct SyncScheduler {
    schedule: Schedule,
    orchestrator: Arc<PipelineOrchestrator>,
}

impl SyncScheduler {
    pub fn new(expression: &str, orchestrator: Arc<PipelineOrchestrator>) -> anyhow::Result<Self> {
        let normalized = normalize_expression(expression);
        let schedule = normalized
            .parse::<Schedule>()
            .with_context(|| format!("invalid cron expression '{expression}'"))?;
        Ok(Self {
            schedule,
            orchestrator,
        })
    }

    /// Run until the token is cancelled
    pub async fn run(&self, shutdown: CancellationToken) {
        let ist = FixedOffset::east_opt(IST_OFFSET_SECS).unwrap();

        loop {
            let now = Utc::now().with_timezone(&ist);
            let Some(next) = self.schedule.after(&now).next() else {
                warn!("Cron schedule has no future fire times, scheduler stopping");
                return;
            };
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            info!(next_fire = %next, "Next scheduled sync");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    match self.orchestrator.clone().try_start(SyncMode::Incremental) {
                        Ok(()) => info!("Scheduled incremental sync started"),
                        Err(PipelineError::AlreadyRunning) => {
                            warn!("Scheduled sync skipped: a run is already in progress");
                        }
                        Err(PipelineError::Other(e)) => {
                            warn!(error = %format!("{e:#}"), "Scheduled sync failed to start");
                        }
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("Scheduler shutting down");
                    return;
                }
            }
        }
    }
}
