//! Fundsight Pipeline - resumable NAV ingestion
//!
//! Sequences discovery, per-scheme backfill or incremental sync, and
//! analytics recomputation, under a process-wide single-run slot and a
//! durable pipeline-status row.
//!
//! ## Modules
//!
//! - [`discovery`] - filter the upstream catalog to the tracked AMC ×
//!   category subset
//! - [`backfill`] - full-history ingestion with per-scheme resume
//! - [`incremental`] - delta ingestion of dates newer than the last
//!   persisted one
//! - [`orchestrator`] - run sequencing, progress reporting, crash recovery

pub mod backfill;
pub mod discovery;
pub mod incremental;
pub mod orchestrator;

use std::str::FromStr;

use thiserror::Error;

pub use backfill::BackfillRunner;
pub use incremental::IncrementalRunner;
pub use orchestrator::PipelineOrchestrator;

/// Errors surfaced by the pipeline control plane
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A second trigger arrived while a run holds the slot
    #[error("a pipeline run is already in progress")]
    AlreadyRunning,

    /// Anything else that escaped a run
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// What processing one scheme received during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemeAction {
    /// The scheme was (re)processed and its sync state is now `completed`
    Completed {
        /// History records seen by this run
        records: u64,
    },
    /// The scheme needed no work (e.g. backfill already `completed`)
    Skipped,
    /// Processing failed; the error is recorded on the sync-state row and
    /// the run moves on to the next scheme
    Failed {
        /// The recorded error message
        error: String,
    },
}

/// Which pipeline flavor to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Discovery, backfill, analytics
    Full,
    /// Incremental sync, analytics
    Incremental,
}

impl SyncMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incremental",
        }
    }
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Self::Full),
            "incremental" => Ok(Self::Incremental),
            other => Err(format!("unknown sync mode '{other}'")),
        }
    }
}
