//! Test server bootstrap: in-memory fakes wired into a real listener

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

use fundsight_api::{ApiServer, AppState, MetricsRegistry};
use fundsight_core::config::RateLimitsConfig;
use fundsight_core::domain::{
    AnalyticsRow, Fund, NavPoint, PipelineStatus, SchemeCode, SyncState, SyncType, Window,
};
use fundsight_core::ports::{
    CatalogEntry, FundFilter, IAnalyticsRepository, IFundRepository, IFundSource, INavRepository,
    IPipelineStatusRepository, ISyncStateRepository, RankMetric, RankQuery, RankedFund,
    SchemeHistory,
};
use fundsight_limiter::{MemoryBucketStore, RateLimiter};
use fundsight_pipeline::PipelineOrchestrator;

pub fn code(s: &str) -> SchemeCode {
    SchemeCode::new(s).unwrap()
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn sample_fund(scheme_code: &str, name: &str, amc: &str, category: &str) -> Fund {
    Fund {
        scheme_code: code(scheme_code),
        scheme_name: name.to_string(),
        amc: amc.to_string(),
        category: category.to_string(),
        scheme_type: Some("Open Ended Schemes".to_string()),
        created_at: Some(Utc::now()),
        updated_at: Some(Utc::now()),
    }
}

pub fn sample_row(scheme_code: &str, window: Window, median: f64, drawdown: f64) -> AnalyticsRow {
    AnalyticsRow {
        scheme_code: code(scheme_code),
        window,
        rolling_return_min: median - 0.1,
        rolling_return_max: median + 0.1,
        rolling_return_median: median,
        rolling_return_p25: median - 0.05,
        rolling_return_p75: median + 0.05,
        max_drawdown: drawdown,
        cagr_min: median - 0.02,
        cagr_max: median + 0.02,
        cagr_median: median,
        data_start_date: day(2015, 1, 1),
        data_end_date: day(2025, 1, 1),
        computed_at: Utc::now(),
    }
}

#[derive(Default)]
pub struct FakeFundRepo {
    pub funds: Mutex<HashMap<String, Fund>>,
}

#[async_trait::async_trait]
impl IFundRepository for FakeFundRepo {
    async fn upsert(&self, fund: &Fund) -> anyhow::Result<()> {
        self.funds
            .lock()
            .unwrap()
            .insert(fund.scheme_code.as_str().to_string(), fund.clone());
        Ok(())
    }

    async fn get(&self, scheme_code: &SchemeCode) -> anyhow::Result<Option<Fund>> {
        Ok(self.funds.lock().unwrap().get(scheme_code.as_str()).cloned())
    }

    async fn list(&self, filter: &FundFilter) -> anyhow::Result<Vec<Fund>> {
        let mut funds: Vec<Fund> = self
            .funds
            .lock()
            .unwrap()
            .values()
            .filter(|f| {
                filter
                    .category
                    .as_ref()
                    .map_or(true, |c| f.category.to_lowercase().contains(&c.to_lowercase()))
                    && filter
                        .amc
                        .as_ref()
                        .map_or(true, |a| f.amc.to_lowercase().contains(&a.to_lowercase()))
            })
            .cloned()
            .collect();
        funds.sort_by(|a, b| a.scheme_name.cmp(&b.scheme_name));
        Ok(funds)
    }
}

#[derive(Default)]
pub struct FakeNavRepo {
    pub series: Mutex<HashMap<String, Vec<NavPoint>>>,
}

impl FakeNavRepo {
    pub fn seed(&self, scheme_code: &str, points: Vec<(NaiveDate, i64)>) {
        let mut points: Vec<NavPoint> = points
            .into_iter()
            .map(|(d, v)| NavPoint::new(d, Decimal::from(v)))
            .collect();
        points.sort_by_key(|p| p.date);
        self.series
            .lock()
            .unwrap()
            .insert(scheme_code.to_string(), points);
    }
}

#[async_trait::async_trait]
impl INavRepository for FakeNavRepo {
    async fn upsert_points(
        &self,
        scheme_code: &SchemeCode,
        points: &[NavPoint],
    ) -> anyhow::Result<u64> {
        let mut series = self.series.lock().unwrap();
        let entry = series.entry(scheme_code.as_str().to_string()).or_default();
        for p in points {
            match entry.iter_mut().find(|e| e.date == p.date) {
                Some(existing) => existing.nav = p.nav,
                None => entry.push(*p),
            }
        }
        entry.sort_by_key(|p| p.date);
        Ok(points.len() as u64)
    }

    async fn latest_date(&self, scheme_code: &SchemeCode) -> anyhow::Result<Option<NaiveDate>> {
        Ok(self
            .series
            .lock()
            .unwrap()
            .get(scheme_code.as_str())
            .and_then(|s| s.last().map(|p| p.date)))
    }

    async fn latest_point(&self, scheme_code: &SchemeCode) -> anyhow::Result<Option<NavPoint>> {
        Ok(self
            .series
            .lock()
            .unwrap()
            .get(scheme_code.as_str())
            .and_then(|s| s.last().copied()))
    }

    async fn series(&self, scheme_code: &SchemeCode) -> anyhow::Result<Vec<NavPoint>> {
        Ok(self
            .series
            .lock()
            .unwrap()
            .get(scheme_code.as_str())
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeSyncStateRepo {
    pub states: Mutex<HashMap<(String, SyncType), SyncState>>,
}

#[async_trait::async_trait]
impl ISyncStateRepository for FakeSyncStateRepo {
    async fn get(
        &self,
        scheme_code: &SchemeCode,
        sync_type: SyncType,
    ) -> anyhow::Result<Option<SyncState>> {
        Ok(self
            .states
            .lock()
            .unwrap()
            .get(&(scheme_code.as_str().to_string(), sync_type))
            .cloned())
    }

    async fn upsert(&self, state: &SyncState) -> anyhow::Result<()> {
        self.states
            .lock()
            .unwrap()
            .insert((state.scheme_code.as_str().to_string(), state.sync_type), state.clone());
        Ok(())
    }

    async fn counts_by_status(
        &self,
        sync_type: SyncType,
    ) -> anyhow::Result<HashMap<String, u64>> {
        let mut counts = HashMap::new();
        for ((_, ty), state) in self.states.lock().unwrap().iter() {
            if *ty == sync_type {
                *counts.entry(state.status.as_str().to_string()).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

#[derive(Default)]
pub struct FakeStatusRepo {
    pub status: Mutex<PipelineStatus>,
}

#[async_trait::async_trait]
impl IPipelineStatusRepository for FakeStatusRepo {
    async fn get(&self) -> anyhow::Result<PipelineStatus> {
        Ok(self.status.lock().unwrap().clone())
    }

    async fn save(&self, status: &PipelineStatus) -> anyhow::Result<()> {
        *self.status.lock().unwrap() = status.clone();
        Ok(())
    }
}

pub struct FakeAnalyticsRepo {
    pub rows: Mutex<HashMap<(String, Window), AnalyticsRow>>,
    pub funds: Arc<FakeFundRepo>,
}

impl FakeAnalyticsRepo {
    pub fn seed(&self, row: AnalyticsRow) {
        self.rows
            .lock()
            .unwrap()
            .insert((row.scheme_code.as_str().to_string(), row.window), row);
    }
}

#[async_trait::async_trait]
impl IAnalyticsRepository for FakeAnalyticsRepo {
    async fn upsert(&self, row: &AnalyticsRow) -> anyhow::Result<()> {
        self.seed(row.clone());
        Ok(())
    }

    async fn get(
        &self,
        scheme_code: &SchemeCode,
        window: Window,
    ) -> anyhow::Result<Option<AnalyticsRow>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(&(scheme_code.as_str().to_string(), window))
            .cloned())
    }

    async fn delete(&self, scheme_code: &SchemeCode, window: Window) -> anyhow::Result<()> {
        self.rows
            .lock()
            .unwrap()
            .remove(&(scheme_code.as_str().to_string(), window));
        Ok(())
    }

    async fn rank(&self, query: &RankQuery) -> anyhow::Result<Vec<RankedFund>> {
        let funds = self.funds.funds.lock().unwrap().clone();
        let mut ranked: Vec<RankedFund> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|row| row.window == query.window)
            .filter_map(|row| {
                let fund = funds.get(row.scheme_code.as_str())?.clone();
                let keep = query.category.as_ref().map_or(true, |c| {
                    fund.category.to_lowercase().contains(&c.to_lowercase())
                });
                keep.then(|| RankedFund {
                    fund,
                    analytics: row.clone(),
                })
            })
            .collect();

        ranked.sort_by(|a, b| {
            let ordering = match query.sort_by {
                RankMetric::MedianReturn => b
                    .analytics
                    .rolling_return_median
                    .total_cmp(&a.analytics.rolling_return_median),
                RankMetric::MaxDrawdown => a
                    .analytics
                    .max_drawdown
                    .total_cmp(&b.analytics.max_drawdown),
            };
            ordering.then_with(|| a.fund.scheme_code.cmp(&b.fund.scheme_code))
        });
        ranked.truncate(query.limit as usize);
        Ok(ranked)
    }
}

/// Upstream source whose catalog is empty; trigger tests only need timing
#[derive(Default)]
pub struct FakeSource {
    pub list_delay: Mutex<Option<Duration>>,
}

#[async_trait::async_trait]
impl IFundSource for FakeSource {
    async fn list_schemes(&self) -> anyhow::Result<Vec<CatalogEntry>> {
        let delay = *self.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(Vec::new())
    }

    async fn fetch_scheme(&self, scheme_code: &SchemeCode) -> anyhow::Result<SchemeHistory> {
        anyhow::bail!("unexpected fetch for {scheme_code} in API tests")
    }
}

/// A running test server plus handles to its fakes
pub struct TestServer {
    pub base_url: String,
    pub funds: Arc<FakeFundRepo>,
    pub navs: Arc<FakeNavRepo>,
    pub analytics: Arc<FakeAnalyticsRepo>,
    pub sync_states: Arc<FakeSyncStateRepo>,
    pub status: Arc<FakeStatusRepo>,
    pub source: Arc<FakeSource>,
    shutdown: CancellationToken,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

pub async fn spawn_server() -> TestServer {
    let funds = Arc::new(FakeFundRepo::default());
    let navs = Arc::new(FakeNavRepo::default());
    let sync_states = Arc::new(FakeSyncStateRepo::default());
    let status = Arc::new(FakeStatusRepo::default());
    let analytics = Arc::new(FakeAnalyticsRepo {
        rows: Mutex::new(HashMap::new()),
        funds: Arc::clone(&funds),
    });
    let source = Arc::new(FakeSource::default());

    let limiter = Arc::new(RateLimiter::new(
        Arc::new(MemoryBucketStore::new()),
        &RateLimitsConfig::default(),
    ));

    let orchestrator = Arc::new(PipelineOrchestrator::new(
        Arc::clone(&source) as Arc<dyn IFundSource>,
        Arc::clone(&funds) as Arc<dyn IFundRepository>,
        Arc::clone(&navs) as Arc<dyn INavRepository>,
        Arc::clone(&sync_states) as Arc<dyn ISyncStateRepository>,
        Arc::clone(&analytics) as Arc<dyn IAnalyticsRepository>,
        Arc::clone(&status) as Arc<dyn IPipelineStatusRepository>,
    ));

    let state = Arc::new(AppState {
        funds: Arc::clone(&funds) as Arc<dyn IFundRepository>,
        navs: Arc::clone(&navs) as Arc<dyn INavRepository>,
        analytics: Arc::clone(&analytics) as Arc<dyn IAnalyticsRepository>,
        sync_states: Arc::clone(&sync_states) as Arc<dyn ISyncStateRepository>,
        pipeline_status: Arc::clone(&status) as Arc<dyn IPipelineStatusRepository>,
        limiter,
        orchestrator,
        metrics: Arc::new(MetricsRegistry::new().unwrap()),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();

    let server = ApiServer::new(state);
    let token = shutdown.clone();
    tokio::spawn(async move {
        server.serve(listener, token).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{addr}"),
        funds,
        navs,
        analytics,
        sync_states,
        status,
        source,
        shutdown,
    }
}
