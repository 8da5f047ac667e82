//! fundsightd - NAV ingestion and analytics service
//!
//! Wires the adapters together and runs until SIGINT/SIGTERM:
//! - MySQL pool with schema bootstrap
//! - Redis-backed rate limiter
//! - Upstream NAV client
//! - Pipeline orchestrator (with interrupted-run recovery)
//! - Cron scheduler for the daily incremental sync
//! - HTTP control plane and read API

mod scheduler;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fundsight_api::{ApiServer, AppState, MetricsRegistry};
use fundsight_core::config::Config;
use fundsight_core::ports::{
    IAnalyticsRepository, IFundRepository, IFundSource, INavRepository,
    IPipelineStatusRepository, ISyncStateRepository,
};
use fundsight_limiter::{BucketStore, RateLimiter, RedisBucketStore};
use fundsight_mfapi::MfapiClient;
use fundsight_pipeline::PipelineOrchestrator;
use fundsight_store::{
    DatabasePool, MySqlAnalyticsRepository, MySqlFundRepository, MySqlNavRepository,
    MySqlPipelineStatusRepository, MySqlSyncStateRepository,
};

use crate::scheduler::SyncScheduler;

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install SIGINT handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => error!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("loading configuration")?;

    let errors = config.validate();
    if !errors.is_empty() {
        for error in &errors {
            eprintln!("configuration error: {error}");
        }
        anyhow::bail!("invalid configuration ({} errors)", errors.len());
    }

    init_tracing(&config.logging.level);
    info!(port = config.server.port, "Starting fundsightd");

    // Storage
    let db = DatabasePool::connect(&config.database)
        .await
        .context("connecting to MySQL")?;
    let pool = db.pool().clone();

    let funds: Arc<dyn IFundRepository> = Arc::new(MySqlFundRepository::new(pool.clone()));
    let navs: Arc<dyn INavRepository> = Arc::new(MySqlNavRepository::new(pool.clone()));
    let sync_states: Arc<dyn ISyncStateRepository> =
        Arc::new(MySqlSyncStateRepository::new(pool.clone()));
    let analytics: Arc<dyn IAnalyticsRepository> =
        Arc::new(MySqlAnalyticsRepository::new(pool.clone()));
    let pipeline_status: Arc<dyn IPipelineStatusRepository> =
        Arc::new(MySqlPipelineStatusRepository::new(pool));

    // Rate limiter over Redis
    let bucket_store: Arc<dyn BucketStore> = Arc::new(
        RedisBucketStore::connect(&config.redis.connect_url())
            .await
            .context("connecting to Redis")?,
    );
    let limiter = Arc::new(RateLimiter::new(bucket_store, &config.rate_limits));

    // Upstream client and pipeline
    let source: Arc<dyn IFundSource> = Arc::new(
        MfapiClient::new(&config.upstream, Arc::clone(&limiter))
            .context("building upstream client")?,
    );
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        source,
        Arc::clone(&funds),
        Arc::clone(&navs),
        Arc::clone(&sync_states),
        Arc::clone(&analytics),
        Arc::clone(&pipeline_status),
    ));
    orchestrator
        .recover_interrupted()
        .await
        .context("recovering pipeline status")?;

    let shutdown = CancellationToken::new();

    // Scheduled incremental sync
    let sync_scheduler =
        SyncScheduler::new(&config.scheduler.cron, Arc::clone(&orchestrator))
            .context("parsing SYNC_CRON_SCHEDULE")?;
    let scheduler_token = shutdown.clone();
    let scheduler_task = tokio::spawn(async move {
        sync_scheduler.run(scheduler_token).await;
    });

    // HTTP surface
    let state = Arc::new(AppState {
        funds,
        navs,
        analytics,
        sync_states,
        pipeline_status,
        limiter,
        orchestrator,
        metrics: Arc::new(MetricsRegistry::new()?),
    });
    let server = ApiServer::new(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let server_token = shutdown.clone();
    let server_task = tokio::spawn(async move {
        if let Err(e) = server.run(addr, server_token).await {
            error!(error = %format!("{e:#}"), "API server exited with error");
        }
    });

    shutdown_signal().await;
    info!("Shutdown signal received");
    shutdown.cancel();

    let _ = server_task.await;
    let _ = scheduler_task.await;
    info!("fundsightd stopped");
    Ok(())
}
