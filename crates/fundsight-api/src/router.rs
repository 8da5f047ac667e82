//! Hand-rolled request router
//!
//! Matches on `(method, path segments)`. Route labels are the matched
//! patterns (`/funds/:code`), which keeps metrics cardinality bounded no
//! matter what clients put in the path.

use std::collections::HashMap;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::{Method, Request, Response};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::handlers::{self, ApiError};
use crate::state::AppState;

/// Parse the query string into a last-wins key-value map
fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.unwrap_or("").as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Handle one request end to end: span, dispatch, metrics, request ID
pub async fn handle(req: Request<Incoming>, state: Arc<AppState>) -> Response<Full<Bytes>> {
    let request_id = Uuid::new_v4();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let span = info_span!(
        "http_request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    let (route, mut response) = dispatch(&req, &state).instrument(span).await;

    state.metrics.record_request(route, response.status().as_u16());
    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        "Handled request"
    );

    if let Ok(value) = request_id.to_string().parse() {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

async fn dispatch(
    req: &Request<Incoming>,
    state: &Arc<AppState>,
) -> (&'static str, Response<Full<Bytes>>) {
    let query = parse_query(req.uri().query());
    let segments: Vec<&str> = req.uri().path().split('/').filter(|s| !s.is_empty()).collect();

    let (route, result) = match (req.method(), segments.as_slice()) {
        (&Method::GET, ["health"]) => ("/health", handlers::health(state).await),
        (&Method::GET, ["metrics"]) => ("/metrics", handlers::metrics(state).await),
        (&Method::POST, ["sync", "trigger"]) => {
            ("/sync/trigger", handlers::trigger_sync(state, &query))
        }
        (&Method::GET, ["sync", "status"]) => ("/sync/status", handlers::sync_status(state).await),
        (&Method::GET, ["funds"]) => ("/funds", handlers::list_funds(state, &query).await),
        (&Method::GET, ["funds", "rank"]) => {
            ("/funds/rank", handlers::rank_funds(state, &query).await)
        }
        (&Method::GET, ["funds", code]) => ("/funds/:code", handlers::get_fund(state, code).await),
        (&Method::GET, ["funds", code, "analytics"]) => (
            "/funds/:code/analytics",
            handlers::fund_analytics(state, code, &query).await,
        ),
        _ => (
            "unmatched",
            Err(ApiError::NotFound("no such route".to_string())),
        ),
    };

    (route, result.unwrap_or_else(ApiError::into_response))
}
