//! MySQL implementation of the pipeline-status repository
//!
//! The table holds exactly one row (`id = 1`), seeded by the schema
//! bootstrap. Reads fall back to the idle state if the row is somehow
//! absent, so a wiped table never breaks the control plane.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

use fundsight_core::domain::{PipelinePhase, PipelineState, PipelineStatus};
use fundsight_core::ports::IPipelineStatusRepository;

use crate::StoreError;

/// Fixed primary key of the singleton row
const SINGLETON_ID: i32 = 1;

pub(crate) fn status_from_row(row: &MySqlRow) -> Result<PipelineStatus, StoreError> {
    let state_str: String = row.get("status");
    let state = PipelineState::from_str(&state_str)
        .map_err(|e| StoreError::Mapping(format!("status '{state_str}': {e}")))?;

    let phase_str: Option<String> = row.get("current_phase");
    let current_phase = match phase_str {
        Some(ref s) if !s.is_empty() => Some(
            PipelinePhase::from_str(s)
                .map_err(|e| StoreError::Mapping(format!("current_phase '{s}': {e}")))?,
        ),
        _ => None,
    };

    let total_schemes: i32 = row.get("total_schemes");
    let completed_schemes: i32 = row.get("completed_schemes");
    let failed_schemes: i32 = row.get("failed_schemes");

    Ok(PipelineStatus {
        state,
        current_phase,
        progress_percent: row.get("progress_percent"),
        total_schemes: total_schemes.max(0) as u32,
        completed_schemes: completed_schemes.max(0) as u32,
        failed_schemes: failed_schemes.max(0) as u32,
        started_at: row.get::<Option<DateTime<Utc>>, _>("started_at"),
        completed_at: row.get::<Option<DateTime<Utc>>, _>("completed_at"),
        last_error: row.get("last_error"),
    })
}

/// MySQL-backed [`IPipelineStatusRepository`]
pub struct MySqlPipelineStatusRepository {
    pool: MySqlPool,
}

impl MySqlPipelineStatusRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl IPipelineStatusRepository for MySqlPipelineStatusRepository {
    async fn get(&self) -> anyhow::Result<PipelineStatus> {
        let row = sqlx::query("SELECT * FROM pipeline_status WHERE id = ?")
            .bind(SINGLETON_ID)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(status_from_row(r)?),
            None => Ok(PipelineStatus::idle()),
        }
    }

    async fn save(&self, status: &PipelineStatus) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO pipeline_status \
             (id, status, current_phase, progress_percent, total_schemes, \
              completed_schemes, failed_schemes, started_at, completed_at, last_error) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON DUPLICATE KEY UPDATE \
               status = VALUES(status), \
               current_phase = VALUES(current_phase), \
               progress_percent = VALUES(progress_percent), \
               total_schemes = VALUES(total_schemes), \
               completed_schemes = VALUES(completed_schemes), \
               failed_schemes = VALUES(failed_schemes), \
               started_at = VALUES(started_at), \
               completed_at = VALUES(completed_at), \
               last_error = VALUES(last_error)",
        )
        .bind(SINGLETON_ID)
        .bind(status.state.as_str())
        .bind(status.current_phase.map(|p| p.as_str()))
        .bind(status.progress_percent)
        .bind(status.total_schemes as i32)
        .bind(status.completed_schemes as i32)
        .bind(status.failed_schemes as i32)
        .bind(status.started_at)
        .bind(status.completed_at)
        .bind(&status.last_error)
        .execute(&self.pool)
        .await?;

        tracing::trace!(state = %status.state, percent = status.progress_percent, "Saved pipeline status");
        Ok(())
    }
}
