//! Request handlers
//!
//! Each handler returns `Result<Response, ApiError>`; the router turns an
//! `ApiError` into its JSON error response. Handlers never panic on user
//! input: bad parameters are 400s, absent resources are 404s.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::json;

use fundsight_core::domain::{SchemeCode, SyncType, Window};
use fundsight_core::ports::{FundFilter, RankMetric, RankQuery};
use fundsight_pipeline::{PipelineError, SyncMode};

use crate::state::AppState;

/// Handler-level error, mapped onto an HTTP status by the router
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_response(self) -> Response<Full<Bytes>> {
        let status = self.status();
        let message = match &self {
            Self::BadRequest(m) | Self::NotFound(m) | Self::Conflict(m) => m.clone(),
            // Internal detail stays in the logs, not the response
            Self::Internal(e) => {
                tracing::error!(error = %format!("{e:#}"), "Handler error");
                "internal error".to_string()
            }
        };
        json_response(status, &json!({ "error": message }))
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::Internal(e)
    }
}

pub type HandlerResult = Result<Response<Full<Bytes>>, ApiError>;

/// Build a JSON response; serialization of our own types cannot fail
pub fn json_response(status: StatusCode, body: &impl Serialize) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// Scale a raw fraction to a percentage rounded to one decimal
fn pct(fraction: f64) -> f64 {
    (fraction * 1000.0).round() / 10.0
}

// ---------------------------------------------------------------------------
// Liveness and metrics
// ---------------------------------------------------------------------------

pub async fn health(state: &Arc<AppState>) -> HandlerResult {
    // The limiter peek is best-effort; a store outage must not fail liveness
    let buckets = match state.limiter.status().await {
        Ok(snapshots) => Some(
            snapshots
                .iter()
                .map(|b| json!({ "name": b.name, "tokens": b.tokens }))
                .collect::<Vec<_>>(),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Limiter peek failed during health check");
            None
        }
    };

    Ok(json_response(
        StatusCode::OK,
        &json!({ "status": "ok", "rate_limiter": buckets }),
    ))
}

pub async fn metrics(state: &Arc<AppState>) -> HandlerResult {
    let stats = state.limiter.stats();
    state.metrics.limiter_allowed.set(stats.allowed as i64);
    state.metrics.limiter_denied.set(stats.denied as i64);
    state.metrics.limiter_fail_open.set(stats.fail_open as i64);
    state
        .metrics
        .pipeline_running
        .set(i64::from(state.orchestrator.is_running()));

    let body = state.metrics.encode().map_err(ApiError::Internal)?;
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/plain; version=0.0.4; charset=utf-8")
        .body(Full::new(Bytes::from(body)))
        .unwrap())
}

// ---------------------------------------------------------------------------
// Control plane
// ---------------------------------------------------------------------------

pub fn trigger_sync(state: &Arc<AppState>, query: &HashMap<String, String>) -> HandlerResult {
    let mode = query
        .get("mode")
        .ok_or_else(|| ApiError::BadRequest("missing 'mode' parameter".to_string()))?;
    let mode = SyncMode::from_str(mode).map_err(ApiError::BadRequest)?;

    match state.orchestrator.clone().try_start(mode) {
        Ok(()) => Ok(json_response(
            StatusCode::ACCEPTED,
            &json!({ "status": "accepted", "mode": mode.as_str() }),
        )),
        Err(PipelineError::AlreadyRunning) => Err(ApiError::Conflict(
            "a pipeline run is already in progress".to_string(),
        )),
        Err(PipelineError::Other(e)) => Err(ApiError::Internal(e)),
    }
}

pub async fn sync_status(state: &Arc<AppState>) -> HandlerResult {
    let pipeline = state.pipeline_status.get().await?;
    let backfill = state.sync_states.counts_by_status(SyncType::Backfill).await?;
    let incremental = state
        .sync_states
        .counts_by_status(SyncType::Incremental)
        .await?;

    let limiter = match state.limiter.status().await {
        Ok(snapshots) => Some(
            snapshots
                .iter()
                .map(|b| {
                    json!({
                        "name": b.name,
                        "tokens": b.tokens,
                        "last_refill_ms": b.last_refill_ms,
                    })
                })
                .collect::<Vec<_>>(),
        ),
        Err(_) => None,
    };
    let stats = state.limiter.stats();

    Ok(json_response(
        StatusCode::OK,
        &json!({
            "pipeline": pipeline,
            "sync_counts": { "backfill": backfill, "incremental": incremental },
            "rate_limiter": {
                "buckets": limiter,
                "stats": {
                    "allowed": stats.allowed,
                    "denied": stats.denied,
                    "fail_open": stats.fail_open,
                },
            },
        }),
    ))
}

// ---------------------------------------------------------------------------
// Read API
// ---------------------------------------------------------------------------

pub async fn list_funds(state: &Arc<AppState>, query: &HashMap<String, String>) -> HandlerResult {
    let filter = FundFilter {
        category: query.get("category").cloned(),
        amc: query.get("amc").cloned(),
    };
    let funds = state.funds.list(&filter).await?;
    Ok(json_response(StatusCode::OK, &funds))
}

pub async fn get_fund(state: &Arc<AppState>, code: &str) -> HandlerResult {
    let scheme_code = parse_code(code)?;
    let fund = state
        .funds
        .get(&scheme_code)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no fund with scheme code '{code}'")))?;

    let latest = state.navs.latest_point(&scheme_code).await?;
    Ok(json_response(
        StatusCode::OK,
        &json!({
            "fund": fund,
            "latest_nav": latest.map(|p| json!({ "date": p.date, "nav": p.nav })),
        }),
    ))
}

pub async fn fund_analytics(
    state: &Arc<AppState>,
    code: &str,
    query: &HashMap<String, String>,
) -> HandlerResult {
    let scheme_code = parse_code(code)?;
    let window = query
        .get("window")
        .ok_or_else(|| ApiError::BadRequest("missing 'window' parameter".to_string()))?;
    let window = Window::from_str(window)
        .map_err(|_| ApiError::BadRequest(format!("invalid window '{window}'")))?;

    let row = state
        .analytics
        .get(&scheme_code, window)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("no {window} analytics for scheme '{code}'"))
        })?;

    Ok(json_response(
        StatusCode::OK,
        &json!({
            "scheme_code": row.scheme_code,
            "window": row.window,
            "rolling_returns": {
                "min": pct(row.rolling_return_min),
                "max": pct(row.rolling_return_max),
                "median": pct(row.rolling_return_median),
                "p25": pct(row.rolling_return_p25),
                "p75": pct(row.rolling_return_p75),
            },
            "cagr": {
                "min": pct(row.cagr_min),
                "max": pct(row.cagr_max),
                "median": pct(row.cagr_median),
            },
            "max_drawdown": pct(row.max_drawdown),
            "data_start_date": row.data_start_date,
            "data_end_date": row.data_end_date,
            "computed_at": row.computed_at,
        }),
    ))
}

/// Hard cap on ranking size, so `limit` cannot become a table scan dump
const MAX_RANK_LIMIT: u32 = 50;

pub async fn rank_funds(state: &Arc<AppState>, query: &HashMap<String, String>) -> HandlerResult {
    let window = query
        .get("window")
        .ok_or_else(|| ApiError::BadRequest("missing 'window' parameter".to_string()))?;
    let window = Window::from_str(window)
        .map_err(|_| ApiError::BadRequest(format!("invalid window '{window}'")))?;

    let sort_by = match query.get("sort_by").map(String::as_str) {
        None | Some("median_return") => RankMetric::MedianReturn,
        Some("max_drawdown") => RankMetric::MaxDrawdown,
        Some(other) => {
            return Err(ApiError::BadRequest(format!("invalid sort_by '{other}'")));
        }
    };

    let limit = match query.get("limit") {
        None => 5,
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| ApiError::BadRequest(format!("invalid limit '{raw}'")))?,
    }
    .min(MAX_RANK_LIMIT);

    let ranked = state
        .analytics
        .rank(&RankQuery {
            category: query.get("category").cloned(),
            window,
            sort_by,
            limit,
        })
        .await?;

    let body: Vec<_> = ranked
        .iter()
        .map(|r| {
            json!({
                "scheme_code": r.fund.scheme_code,
                "scheme_name": r.fund.scheme_name,
                "amc": r.fund.amc,
                "category": r.fund.category,
                "window": r.analytics.window,
                "median_return": pct(r.analytics.rolling_return_median),
                "max_drawdown": pct(r.analytics.max_drawdown),
            })
        })
        .collect();
    Ok(json_response(StatusCode::OK, &body))
}

fn parse_code(code: &str) -> Result<SchemeCode, ApiError> {
    // An invalid code cannot name any fund, so it reads as absence
    SchemeCode::new(code)
        .map_err(|_| ApiError::NotFound(format!("no fund with scheme code '{code}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pct_scales_and_rounds_to_one_decimal() {
        assert_eq!(pct(0.1487), 14.9);
        assert_eq!(pct(-0.2), -20.0);
        assert_eq!(pct(0.0), 0.0);
        assert_eq!(pct(0.12345), 12.3);
        assert_eq!(pct(1.0), 100.0);
    }

    #[test]
    fn invalid_scheme_code_reads_as_not_found() {
        let err = parse_code("no such scheme!").unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn api_error_statuses() {
        assert_eq!(
            ApiError::BadRequest(String::new()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Conflict(String::new()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::NotFound(String::new()).status(),
            StatusCode::NOT_FOUND
        );
    }
}
