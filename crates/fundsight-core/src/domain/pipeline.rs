//! Process-wide pipeline status
//!
//! A single durable row (`id = 1`) records what the pipeline is doing.
//! The orchestrator is the only writer; the read API and the startup
//! recovery check are readers.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Overall pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Idle,
    Running,
    Failed,
}

impl PipelineState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Failed => "failed",
        }
    }
}

impl Display for PipelineState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "running" => Ok(Self::Running),
            "failed" => Ok(Self::Failed),
            other => Err(DomainError::UnknownVariant {
                kind: "pipeline state",
                value: other.to_string(),
            }),
        }
    }
}

/// Phase the pipeline is currently executing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelinePhase {
    Discovery,
    Backfill,
    Incremental,
    Analytics,
}

impl PipelinePhase {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::Backfill => "backfill",
            Self::Incremental => "incremental",
            Self::Analytics => "analytics",
        }
    }
}

impl Display for PipelinePhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelinePhase {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discovery" => Ok(Self::Discovery),
            "backfill" => Ok(Self::Backfill),
            "incremental" => Ok(Self::Incremental),
            "analytics" => Ok(Self::Analytics),
            other => Err(DomainError::UnknownVariant {
                kind: "pipeline phase",
                value: other.to_string(),
            }),
        }
    }
}

/// The singleton pipeline status row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStatus {
    pub state: PipelineState,
    pub current_phase: Option<PipelinePhase>,
    /// 0.0 to 100.0, linearly interpolated within phase boundaries
    pub progress_percent: f64,
    pub total_schemes: u32,
    pub completed_schemes: u32,
    pub failed_schemes: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl PipelineStatus {
    /// The resting state: idle with no phase and no progress
    pub fn idle() -> Self {
        Self {
            state: PipelineState::Idle,
            current_phase: None,
            progress_percent: 0.0,
            total_schemes: 0,
            completed_schemes: 0,
            failed_schemes: 0,
            started_at: None,
            completed_at: None,
            last_error: None,
        }
    }

    /// Begin a new run: running, zero counters, fresh start time
    pub fn start(&mut self, phase: PipelinePhase, now: DateTime<Utc>) {
        self.state = PipelineState::Running;
        self.current_phase = Some(phase);
        self.progress_percent = 0.0;
        self.total_schemes = 0;
        self.completed_schemes = 0;
        self.failed_schemes = 0;
        self.started_at = Some(now);
        self.completed_at = None;
        self.last_error = None;
    }

    /// Finish the run successfully
    pub fn finish(&mut self, now: DateTime<Utc>) {
        self.state = PipelineState::Idle;
        self.current_phase = None;
        self.progress_percent = 100.0;
        self.completed_at = Some(now);
    }

    /// Record an unhandled failure, preserving the error string
    pub fn fail(&mut self, error: impl Into<String>, now: DateTime<Utc>) {
        self.state = PipelineState::Failed;
        self.last_error = Some(error.into());
        self.completed_at = Some(now);
    }

    /// Whether a previous run was interrupted (row left `running`)
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.state == PipelineState::Running
    }
}

impl Default for PipelineStatus {
    fn default() -> Self {
        Self::idle()
    }
}
