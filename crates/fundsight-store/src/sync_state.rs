//! MySQL implementation of the sync-state repository

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

use fundsight_core::domain::{SchemeCode, SyncState, SyncStatus, SyncType};
use fundsight_core::ports::ISyncStateRepository;

use crate::StoreError;

pub(crate) fn sync_state_from_row(row: &MySqlRow) -> Result<SyncState, StoreError> {
    let code_str: String = row.get("scheme_code");
    let scheme_code = SchemeCode::from_str(&code_str)
        .map_err(|e| StoreError::Mapping(format!("scheme_code '{code_str}': {e}")))?;

    let type_str: String = row.get("sync_type");
    let sync_type = SyncType::from_str(&type_str)
        .map_err(|e| StoreError::Mapping(format!("sync_type '{type_str}': {e}")))?;

    let status_str: String = row.get("status");
    let status = SyncStatus::from_str(&status_str)
        .map_err(|e| StoreError::Mapping(format!("status '{status_str}': {e}")))?;

    let total_records: i64 = row.get("total_records");

    Ok(SyncState {
        scheme_code,
        sync_type,
        status,
        last_synced_date: row.get::<Option<NaiveDate>, _>("last_synced_date"),
        total_records: total_records.max(0) as u64,
        error_message: row.get("error_message"),
        started_at: row.get::<Option<DateTime<Utc>>, _>("started_at"),
        completed_at: row.get::<Option<DateTime<Utc>>, _>("completed_at"),
    })
}

/// MySQL-backed [`ISyncStateRepository`]
pub struct MySqlSyncStateRepository {
    pool: MySqlPool,
}

impl MySqlSyncStateRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ISyncStateRepository for MySqlSyncStateRepository {
    async fn get(
        &self,
        scheme_code: &SchemeCode,
        sync_type: SyncType,
    ) -> anyhow::Result<Option<SyncState>> {
        let row = sqlx::query("SELECT * FROM sync_state WHERE scheme_code = ? AND sync_type = ?")
            .bind(scheme_code.as_str())
            .bind(sync_type.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(sync_state_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, state: &SyncState) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO sync_state \
             (scheme_code, sync_type, status, last_synced_date, total_records, \
              error_message, started_at, completed_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON DUPLICATE KEY UPDATE \
               status = VALUES(status), \
               last_synced_date = VALUES(last_synced_date), \
               total_records = VALUES(total_records), \
               error_message = VALUES(error_message), \
               started_at = VALUES(started_at), \
               completed_at = VALUES(completed_at)",
        )
        .bind(state.scheme_code.as_str())
        .bind(state.sync_type.as_str())
        .bind(state.status.as_str())
        .bind(state.last_synced_date)
        .bind(state.total_records as i64)
        .bind(&state.error_message)
        .bind(state.started_at)
        .bind(state.completed_at)
        .execute(&self.pool)
        .await?;

        tracing::trace!(
            scheme_code = %state.scheme_code,
            sync_type = %state.sync_type,
            status = %state.status,
            "Upserted sync state"
        );
        Ok(())
    }

    async fn counts_by_status(
        &self,
        sync_type: SyncType,
    ) -> anyhow::Result<HashMap<String, u64>> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS count FROM sync_state \
             WHERE sync_type = ? GROUP BY status",
        )
        .bind(sync_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut counts = HashMap::new();
        for row in &rows {
            let status: String = row.get("status");
            let count: i64 = row.get("count");
            counts.insert(status, count.max(0) as u64);
        }
        Ok(counts)
    }
}
