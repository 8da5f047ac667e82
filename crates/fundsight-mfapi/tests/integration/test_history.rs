//! Per-scheme history tests

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;

use fundsight_core::domain::SchemeCode;
use fundsight_mfapi::MfapiError;

use crate::common::{mount_history, mount_history_status, setup_client};

fn code(s: &str) -> SchemeCode {
    SchemeCode::new(s).unwrap()
}

fn sample_history() -> serde_json::Value {
    json!({
        "meta": {
            "fund_house": "Motilal Oswal Mutual Fund",
            "scheme_type": "Open Ended Schemes",
            "scheme_category": "Equity Scheme - Mid Cap Fund",
            "scheme_code": 127042,
            "scheme_name": "Motilal Oswal Midcap Fund - Direct Plan - Growth"
        },
        "data": [
            {"date": "03-01-2024", "nav": "104.3817"},
            {"date": "02-01-2024", "nav": "103.2991"},
            {"date": "01-01-2024", "nav": "102.0050"}
        ]
    })
}

#[tokio::test]
async fn history_is_normalized_to_ascending_dates() {
    let (server, client) = setup_client().await;
    mount_history(&server, "127042", sample_history()).await;

    let history = client.fetch_scheme(&code("127042")).await.unwrap();
    assert_eq!(history.points.len(), 3);
    assert_eq!(
        history.points[0].date,
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    );
    assert_eq!(
        history.points[0].nav,
        Decimal::from_str("102.0050").unwrap()
    );
    assert!(history.points.windows(2).all(|w| w[0].date < w[1].date));
    assert_eq!(
        history.last_date(),
        NaiveDate::from_ymd_opt(2024, 1, 3)
    );
}

#[tokio::test]
async fn meta_is_mapped_through() {
    let (server, client) = setup_client().await;
    mount_history(&server, "127042", sample_history()).await;

    let history = client.fetch_scheme(&code("127042")).await.unwrap();
    assert_eq!(history.meta.scheme_code.as_str(), "127042");
    assert_eq!(history.meta.fund_house, "Motilal Oswal Mutual Fund");
    assert_eq!(
        history.meta.scheme_type.as_deref(),
        Some("Open Ended Schemes")
    );
    assert_eq!(
        history.meta.scheme_category.as_deref(),
        Some("Equity Scheme - Mid Cap Fund")
    );
}

#[tokio::test]
async fn junk_entries_are_skipped() {
    let (server, client) = setup_client().await;
    mount_history(
        &server,
        "127042",
        json!({
            "meta": {
                "fund_house": "Motilal Oswal Mutual Fund",
                "scheme_code": 127042,
                "scheme_name": "Motilal Oswal Midcap Fund - Direct Plan - Growth"
            },
            "data": [
                {"date": "02-01-2024", "nav": "103.2991"},
                {"date": "not-a-date", "nav": "99.0"},
                {"date": "01-01-2024", "nav": "N.A."}
            ]
        }),
    )
    .await;

    let history = client.fetch_scheme(&code("127042")).await.unwrap();
    assert_eq!(history.points.len(), 1);
}

#[tokio::test]
async fn empty_history_yields_empty_series() {
    let (server, client) = setup_client().await;
    mount_history(
        &server,
        "127042",
        json!({
            "meta": {
                "fund_house": "Motilal Oswal Mutual Fund",
                "scheme_code": 127042,
                "scheme_name": "Motilal Oswal Midcap Fund - Direct Plan - Growth"
            },
            "data": []
        }),
    )
    .await;

    let history = client.fetch_scheme(&code("127042")).await.unwrap();
    assert!(history.points.is_empty());
    assert!(history.last_date().is_none());
}

#[tokio::test]
async fn http_429_is_a_fatal_breach() {
    let (server, client) = setup_client().await;
    mount_history_status(&server, "127042", 429).await;

    let err = client.fetch_scheme(&code("127042")).await.unwrap_err();
    assert!(matches!(err, MfapiError::RateLimitBreach));
}

#[tokio::test]
async fn http_500_propagates_as_status_error() {
    let (server, client) = setup_client().await;
    mount_history_status(&server, "127042", 500).await;

    let err = client.fetch_scheme(&code("127042")).await.unwrap_err();
    match err {
        MfapiError::Status { status, path } => {
            assert_eq!(status, 500);
            assert_eq!(path, "/127042");
        }
        other => panic!("expected Status error, got {other:?}"),
    }
}

#[tokio::test]
async fn http_404_propagates_as_status_error() {
    let (server, client) = setup_client().await;
    mount_history_status(&server, "999999", 404).await;

    let err = client.fetch_scheme(&code("999999")).await.unwrap_err();
    assert!(matches!(err, MfapiError::Status { status: 404, .. }));
}
