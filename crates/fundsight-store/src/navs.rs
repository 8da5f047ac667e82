//! MySQL implementation of the NAV repository
//!
//! NAV writes are bulk multi-row upserts: duplicate `(scheme, nav_date)`
//! rows overwrite the stored NAV, which is what makes backfill resumable
//! and incremental sync safe against full-history responses.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{MySqlPool, Row};

use fundsight_core::domain::{NavPoint, SchemeCode};
use fundsight_core::ports::INavRepository;

/// Rows per INSERT statement; bounded to keep packets comfortably small
const UPSERT_CHUNK_SIZE: usize = 500;

/// Build the multi-row upsert statement for `rows` tuples
fn nav_upsert_sql(rows: usize) -> String {
    let placeholders = vec!["(?, ?, ?)"; rows].join(", ");
    format!(
        "INSERT INTO nav_history (scheme_code, nav_date, nav) VALUES {placeholders} \
         ON DUPLICATE KEY UPDATE nav = VALUES(nav)"
    )
}

/// MySQL-backed [`INavRepository`]
pub struct MySqlNavRepository {
    pool: MySqlPool,
}

impl MySqlNavRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl INavRepository for MySqlNavRepository {
    async fn upsert_points(
        &self,
        scheme_code: &SchemeCode,
        points: &[NavPoint],
    ) -> anyhow::Result<u64> {
        if points.is_empty() {
            return Ok(0);
        }

        for chunk in points.chunks(UPSERT_CHUNK_SIZE) {
            let sql = nav_upsert_sql(chunk.len());
            let mut query = sqlx::query(&sql);
            for point in chunk {
                query = query
                    .bind(scheme_code.as_str())
                    .bind(point.date)
                    .bind(point.nav);
            }
            query.execute(&self.pool).await?;
        }

        tracing::debug!(
            scheme_code = %scheme_code,
            points = points.len(),
            "Upserted NAV points"
        );
        Ok(points.len() as u64)
    }

    async fn latest_date(&self, scheme_code: &SchemeCode) -> anyhow::Result<Option<NaiveDate>> {
        let latest: Option<NaiveDate> =
            sqlx::query_scalar("SELECT MAX(nav_date) FROM nav_history WHERE scheme_code = ?")
                .bind(scheme_code.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(latest)
    }

    async fn latest_point(&self, scheme_code: &SchemeCode) -> anyhow::Result<Option<NavPoint>> {
        let row = sqlx::query(
            "SELECT nav_date, nav FROM nav_history \
             WHERE scheme_code = ? ORDER BY nav_date DESC LIMIT 1",
        )
        .bind(scheme_code.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| NavPoint::new(r.get::<NaiveDate, _>("nav_date"), r.get::<Decimal, _>("nav"))))
    }

    async fn series(&self, scheme_code: &SchemeCode) -> anyhow::Result<Vec<NavPoint>> {
        let rows = sqlx::query(
            "SELECT nav_date, nav FROM nav_history \
             WHERE scheme_code = ? ORDER BY nav_date ASC",
        )
        .bind(scheme_code.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| NavPoint::new(r.get::<NaiveDate, _>("nav_date"), r.get::<Decimal, _>("nav")))
            .collect())
    }
}
