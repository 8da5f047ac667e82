//! Catalog listing tests

use serde_json::json;

use crate::common::{mount_catalog, setup_client};

#[tokio::test]
async fn lists_schemes_in_upstream_order() {
    let (server, client) = setup_client().await;
    mount_catalog(
        &server,
        json!([
            {"schemeCode": 127042, "schemeName": "Motilal Oswal Midcap Fund - Direct Plan - Growth"},
            {"schemeCode": 118989, "schemeName": "Nippon India Small Cap Fund - Direct Plan - Growth"},
        ]),
    )
    .await;

    let entries = client.list_schemes().await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].scheme_code.as_str(), "127042");
    assert_eq!(
        entries[1].scheme_name,
        "Nippon India Small Cap Fund - Direct Plan - Growth"
    );
}

#[tokio::test]
async fn accepts_string_scheme_codes() {
    let (server, client) = setup_client().await;
    mount_catalog(
        &server,
        json!([{"schemeCode": "100033", "schemeName": "Some Fund"}]),
    )
    .await;

    let entries = client.list_schemes().await.unwrap();
    assert_eq!(entries[0].scheme_code.as_str(), "100033");
}

#[tokio::test]
async fn drops_entries_with_invalid_codes() {
    let (server, client) = setup_client().await;
    mount_catalog(
        &server,
        json!([
            {"schemeCode": "not a valid scheme code at all", "schemeName": "Broken"},
            {"schemeCode": 127042, "schemeName": "Fine"},
        ]),
    )
    .await;

    let entries = client.list_schemes().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].scheme_name, "Fine");
}

#[tokio::test]
async fn empty_catalog_is_not_an_error() {
    let (server, client) = setup_client().await;
    mount_catalog(&server, json!([])).await;

    let entries = client.list_schemes().await.unwrap();
    assert!(entries.is_empty());
}
