//! Upstream NAV API HTTP client
//!
//! Thin typed wrapper over `reqwest`. Every outbound call acquires a token
//! from the shared rate limiter first; a 429 despite that gate is treated
//! as a fatal calibration error, never retried here.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use fundsight_core::config::UpstreamConfig;
use fundsight_core::domain::SchemeCode;
use fundsight_core::ports::{CatalogEntry, IFundSource, SchemeHistory, SchemeMeta};
use fundsight_limiter::RateLimiter;

use crate::model::{normalize_history, RawCatalogEntry, RawHistory};
use crate::MfapiError;

/// HTTP client for the upstream NAV API
///
/// The base URL is configuration-driven, which is also how the integration
/// tests point it at a mock server.
pub struct MfapiClient {
    http: Client,
    base_url: String,
    limiter: Arc<RateLimiter>,
}

impl MfapiClient {
    /// Build a client from configuration and the shared limiter
    pub fn new(config: &UpstreamConfig, limiter: Arc<RateLimiter>) -> Result<Self, MfapiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limiter,
        })
    }

    /// Gate on the limiter, issue the GET, and screen the status code
    async fn get(&self, path: &str) -> Result<reqwest::Response, MfapiError> {
        self.limiter.wait_for_token(None).await?;

        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "Fetching from upstream");
        let response = self.http.get(&url).send().await?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => Err(MfapiError::RateLimitBreach),
            status if !status.is_success() => Err(MfapiError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            }),
            _ => Ok(response),
        }
    }

    /// Fetch the full scheme catalog
    ///
    /// Entries whose scheme code fails domain validation are dropped with a
    /// warning rather than failing the listing.
    pub async fn list_schemes(&self) -> Result<Vec<CatalogEntry>, MfapiError> {
        let raw: Vec<RawCatalogEntry> = self.get("/").await?.json().await?;

        let mut entries = Vec::with_capacity(raw.len());
        for item in raw {
            match SchemeCode::new(&item.scheme_code) {
                Ok(scheme_code) => entries.push(CatalogEntry {
                    scheme_code,
                    scheme_name: item.scheme_name,
                }),
                Err(e) => {
                    warn!(code = %item.scheme_code, error = %e, "Dropping catalog entry");
                }
            }
        }
        debug!(count = entries.len(), "Fetched scheme catalog");
        Ok(entries)
    }

    /// Fetch metadata and full normalized NAV history for one scheme
    pub async fn fetch_scheme(&self, scheme_code: &SchemeCode) -> Result<SchemeHistory, MfapiError> {
        let path = format!("/{}", scheme_code.as_str());
        let raw: RawHistory = self.get(&path).await?.json().await?;

        let meta_code = SchemeCode::new(&raw.meta.scheme_code).map_err(|e| {
            MfapiError::Malformed(format!(
                "history meta carries invalid scheme code '{}': {e}",
                raw.meta.scheme_code
            ))
        })?;

        let points = normalize_history(scheme_code.as_str(), &raw.data);
        debug!(
            scheme_code = %scheme_code,
            points = points.len(),
            "Fetched scheme history"
        );

        Ok(SchemeHistory {
            meta: SchemeMeta {
                scheme_code: meta_code,
                scheme_name: raw.meta.scheme_name,
                fund_house: raw.meta.fund_house,
                scheme_type: raw.meta.scheme_type,
                scheme_category: raw.meta.scheme_category,
            },
            points,
        })
    }
}

#[async_trait::async_trait]
impl IFundSource for MfapiClient {
    async fn list_schemes(&self) -> anyhow::Result<Vec<CatalogEntry>> {
        MfapiClient::list_schemes(self).await.map_err(Into::into)
    }

    async fn fetch_scheme(&self, scheme_code: &SchemeCode) -> anyhow::Result<SchemeHistory> {
        MfapiClient::fetch_scheme(self, scheme_code)
            .await
            .map_err(Into::into)
    }
}
