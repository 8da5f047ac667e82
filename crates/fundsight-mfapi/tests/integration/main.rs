//! Integration tests for the upstream NAV API client
//!
//! All tests run against a wiremock server; no real network access.

mod common;
mod test_catalog;
mod test_history;
