//! Shared test helpers for upstream client integration tests
//!
//! Provides wiremock-based mock server setup. Each helper mounts mock
//! endpoints and returns a configured client pointing at the mock server.

use std::sync::Arc;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fundsight_core::config::{BucketSettings, RateLimitsConfig, UpstreamConfig};
use fundsight_limiter::{MemoryBucketStore, RateLimiter};
use fundsight_mfapi::MfapiClient;

/// A limiter generous enough that tests never sleep on it
fn test_limiter() -> Arc<RateLimiter> {
    let wide_open = BucketSettings {
        capacity: 10_000,
        refill_rate: 10_000.0,
        interval_ms: 1_000,
    };
    let config = RateLimitsConfig {
        per_second: wide_open,
        per_minute: wide_open,
        per_hour: wide_open,
        key_prefix: "test:ratelimit".to_string(),
    };
    Arc::new(RateLimiter::new(Arc::new(MemoryBucketStore::new()), &config))
}

/// Start a mock server and build a client pointed at it
pub async fn setup_client() -> (MockServer, MfapiClient) {
    let server = MockServer::start().await;
    let config = UpstreamConfig {
        base_url: server.uri(),
        timeout_secs: 5,
    };
    let client = MfapiClient::new(&config, test_limiter()).expect("build client");
    (server, client)
}

/// Mount the catalog endpoint with the given JSON body
pub async fn mount_catalog(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mount a per-scheme history endpoint with the given JSON body
pub async fn mount_history(server: &MockServer, scheme_code: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/{scheme_code}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mount a per-scheme endpoint returning the given status with no body
pub async fn mount_history_status(server: &MockServer, scheme_code: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/{scheme_code}")))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}
