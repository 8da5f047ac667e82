//! Shared per-process state handed to every request handler

use std::sync::Arc;

use fundsight_core::ports::{
    IAnalyticsRepository, IFundRepository, INavRepository, IPipelineStatusRepository,
    ISyncStateRepository,
};
use fundsight_limiter::RateLimiter;
use fundsight_pipeline::PipelineOrchestrator;

use crate::metrics::MetricsRegistry;

/// Everything the handlers need, shared via `Arc`
pub struct AppState {
    pub funds: Arc<dyn IFundRepository>,
    pub navs: Arc<dyn INavRepository>,
    pub analytics: Arc<dyn IAnalyticsRepository>,
    pub sync_states: Arc<dyn ISyncStateRepository>,
    pub pipeline_status: Arc<dyn IPipelineStatusRepository>,
    pub limiter: Arc<RateLimiter>,
    pub orchestrator: Arc<PipelineOrchestrator>,
    pub metrics: Arc<MetricsRegistry>,
}
