//! MySQL implementation of the analytics repository

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

use fundsight_core::domain::{AnalyticsRow, SchemeCode, Window};
use fundsight_core::ports::{IAnalyticsRepository, RankMetric, RankQuery, RankedFund};

use crate::funds::{fund_from_row, like_pattern};
use crate::StoreError;

pub(crate) fn analytics_from_row(row: &MySqlRow) -> Result<AnalyticsRow, StoreError> {
    let code_str: String = row.get("scheme_code");
    let scheme_code = SchemeCode::from_str(&code_str)
        .map_err(|e| StoreError::Mapping(format!("scheme_code '{code_str}': {e}")))?;

    let window_str: String = row.get("window_type");
    let window = Window::from_str(&window_str)
        .map_err(|e| StoreError::Mapping(format!("window_type '{window_str}': {e}")))?;

    Ok(AnalyticsRow {
        scheme_code,
        window,
        rolling_return_min: row.get("rolling_return_min"),
        rolling_return_max: row.get("rolling_return_max"),
        rolling_return_median: row.get("rolling_return_median"),
        rolling_return_p25: row.get("rolling_return_p25"),
        rolling_return_p75: row.get("rolling_return_p75"),
        max_drawdown: row.get("max_drawdown"),
        cagr_min: row.get("cagr_min"),
        cagr_max: row.get("cagr_max"),
        cagr_median: row.get("cagr_median"),
        data_start_date: row.get::<NaiveDate, _>("data_start_date"),
        data_end_date: row.get::<NaiveDate, _>("data_end_date"),
        computed_at: row.get::<DateTime<Utc>, _>("computed_at"),
    })
}

/// ORDER BY clause for a ranking metric
///
/// Returns are best-first (descending). Drawdowns are ascending per the API
/// contract. Ties break on scheme code so rankings are stable.
fn order_clause(metric: RankMetric) -> &'static str {
    match metric {
        RankMetric::MedianReturn => "a.rolling_return_median DESC, f.scheme_code ASC",
        RankMetric::MaxDrawdown => "a.max_drawdown ASC, f.scheme_code ASC",
    }
}

/// MySQL-backed [`IAnalyticsRepository`]
pub struct MySqlAnalyticsRepository {
    pool: MySqlPool,
}

impl MySqlAnalyticsRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl IAnalyticsRepository for MySqlAnalyticsRepository {
    async fn upsert(&self, row: &AnalyticsRow) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO fund_analytics \
             (scheme_code, window_type, rolling_return_min, rolling_return_max, \
              rolling_return_median, rolling_return_p25, rolling_return_p75, \
              max_drawdown, cagr_min, cagr_max, cagr_median, \
              data_start_date, data_end_date, computed_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON DUPLICATE KEY UPDATE \
               rolling_return_min = VALUES(rolling_return_min), \
               rolling_return_max = VALUES(rolling_return_max), \
               rolling_return_median = VALUES(rolling_return_median), \
               rolling_return_p25 = VALUES(rolling_return_p25), \
               rolling_return_p75 = VALUES(rolling_return_p75), \
               max_drawdown = VALUES(max_drawdown), \
               cagr_min = VALUES(cagr_min), \
               cagr_max = VALUES(cagr_max), \
               cagr_median = VALUES(cagr_median), \
               data_start_date = VALUES(data_start_date), \
               data_end_date = VALUES(data_end_date), \
               computed_at = VALUES(computed_at)",
        )
        .bind(row.scheme_code.as_str())
        .bind(row.window.as_str())
        .bind(row.rolling_return_min)
        .bind(row.rolling_return_max)
        .bind(row.rolling_return_median)
        .bind(row.rolling_return_p25)
        .bind(row.rolling_return_p75)
        .bind(row.max_drawdown)
        .bind(row.cagr_min)
        .bind(row.cagr_max)
        .bind(row.cagr_median)
        .bind(row.data_start_date)
        .bind(row.data_end_date)
        .bind(row.computed_at)
        .execute(&self.pool)
        .await?;

        tracing::trace!(
            scheme_code = %row.scheme_code,
            window = %row.window,
            "Upserted analytics row"
        );
        Ok(())
    }

    async fn get(
        &self,
        scheme_code: &SchemeCode,
        window: Window,
    ) -> anyhow::Result<Option<AnalyticsRow>> {
        let row = sqlx::query(
            "SELECT * FROM fund_analytics WHERE scheme_code = ? AND window_type = ?",
        )
        .bind(scheme_code.as_str())
        .bind(window.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(analytics_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, scheme_code: &SchemeCode, window: Window) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM fund_analytics WHERE scheme_code = ? AND window_type = ?")
            .bind(scheme_code.as_str())
            .bind(window.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn rank(&self, query: &RankQuery) -> anyhow::Result<Vec<RankedFund>> {
        let mut sql = format!(
            "SELECT f.scheme_code, f.scheme_name, f.amc, f.category, f.scheme_type, \
                    f.created_at, f.updated_at, \
                    a.scheme_code, a.window_type, a.rolling_return_min, a.rolling_return_max, \
                    a.rolling_return_median, a.rolling_return_p25, a.rolling_return_p75, \
                    a.max_drawdown, a.cagr_min, a.cagr_max, a.cagr_median, \
                    a.data_start_date, a.data_end_date, a.computed_at \
             FROM fund_analytics a \
             JOIN funds f ON f.scheme_code = a.scheme_code \
             WHERE a.window_type = ?"
        );
        if query.category.is_some() {
            sql.push_str(" AND LOWER(f.category) LIKE ?");
        }
        sql.push_str(&format!(" ORDER BY {} LIMIT ?", order_clause(query.sort_by)));

        let mut q = sqlx::query(&sql).bind(query.window.as_str());
        if let Some(ref category) = query.category {
            q = q.bind(like_pattern(category));
        }
        q = q.bind(query.limit);

        let rows = q.fetch_all(&self.pool).await?;
        let mut ranked = Vec::with_capacity(rows.len());
        for row in &rows {
            ranked.push(RankedFund {
                fund: fund_from_row(row)?,
                analytics: analytics_from_row(row)?,
            });
        }
        Ok(ranked)
    }
}
