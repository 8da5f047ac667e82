//! MySQL implementation of the fund repository

use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use std::str::FromStr;

use fundsight_core::domain::{Fund, SchemeCode};
use fundsight_core::ports::{FundFilter, IFundRepository};

use crate::StoreError;

/// Build the `%...%` pattern for a case-insensitive LIKE filter
pub(crate) fn like_pattern(needle: &str) -> String {
    format!("%{}%", needle.to_lowercase())
}

pub(crate) fn fund_from_row(row: &MySqlRow) -> Result<Fund, StoreError> {
    let code_str: String = row.get("scheme_code");
    let scheme_code = SchemeCode::from_str(&code_str)
        .map_err(|e| StoreError::Mapping(format!("scheme_code '{code_str}': {e}")))?;

    Ok(Fund {
        scheme_code,
        scheme_name: row.get("scheme_name"),
        amc: row.get("amc"),
        category: row.get("category"),
        scheme_type: row.get("scheme_type"),
        created_at: row.get::<Option<DateTime<Utc>>, _>("created_at"),
        updated_at: row.get::<Option<DateTime<Utc>>, _>("updated_at"),
    })
}

/// MySQL-backed [`IFundRepository`]
pub struct MySqlFundRepository {
    pool: MySqlPool,
}

impl MySqlFundRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl IFundRepository for MySqlFundRepository {
    async fn upsert(&self, fund: &Fund) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO funds (scheme_code, scheme_name, amc, category, scheme_type) \
             VALUES (?, ?, ?, ?, ?) \
             ON DUPLICATE KEY UPDATE \
               scheme_name = VALUES(scheme_name), \
               amc = VALUES(amc), \
               category = VALUES(category), \
               scheme_type = VALUES(scheme_type)",
        )
        .bind(fund.scheme_code.as_str())
        .bind(&fund.scheme_name)
        .bind(&fund.amc)
        .bind(&fund.category)
        .bind(&fund.scheme_type)
        .execute(&self.pool)
        .await?;

        tracing::trace!(scheme_code = %fund.scheme_code, "Upserted fund");
        Ok(())
    }

    async fn get(&self, scheme_code: &SchemeCode) -> anyhow::Result<Option<Fund>> {
        let row = sqlx::query("SELECT * FROM funds WHERE scheme_code = ?")
            .bind(scheme_code.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(fund_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, filter: &FundFilter) -> anyhow::Result<Vec<Fund>> {
        let mut sql = String::from("SELECT * FROM funds WHERE 1=1");
        let mut binds: Vec<String> = Vec::new();

        if let Some(ref category) = filter.category {
            sql.push_str(" AND LOWER(category) LIKE ?");
            binds.push(like_pattern(category));
        }
        if let Some(ref amc) = filter.amc {
            sql.push_str(" AND LOWER(amc) LIKE ?");
            binds.push(like_pattern(amc));
        }
        sql.push_str(" ORDER BY scheme_name");

        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind);
        }

        let rows = query.fetch_all(&self.pool).await?;
        let mut funds = Vec::with_capacity(rows.len());
        for row in &rows {
            funds.push(fund_from_row(row)?);
        }
        Ok(funds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_lowercases_and_wraps() {
        assert_eq!(like_pattern("Mid Cap"), "%mid cap%");
        assert_eq!(like_pattern(""), "%%");
    }
}
