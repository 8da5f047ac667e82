//! In-memory fakes of the core ports for pipeline tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use fundsight_core::domain::{
    AnalyticsRow, Fund, NavPoint, PipelineStatus, SchemeCode, SyncState, SyncType, Window,
};
use fundsight_core::ports::{
    CatalogEntry, FundFilter, IAnalyticsRepository, IFundRepository, IFundSource, INavRepository,
    IPipelineStatusRepository, ISyncStateRepository, RankQuery, RankedFund, SchemeHistory,
    SchemeMeta,
};
use fundsight_mfapi::MfapiError;
use fundsight_pipeline::PipelineOrchestrator;

pub fn code(s: &str) -> SchemeCode {
    SchemeCode::new(s).unwrap()
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn point(date: NaiveDate, nav: i64) -> NavPoint {
    NavPoint::new(date, Decimal::from(nav))
}

pub fn history(scheme_code: &str, name: &str, points: Vec<NavPoint>) -> SchemeHistory {
    SchemeHistory {
        meta: SchemeMeta {
            scheme_code: code(scheme_code),
            scheme_name: name.to_string(),
            fund_house: "Test Mutual Fund".to_string(),
            scheme_type: Some("Open Ended Schemes".to_string()),
            scheme_category: None,
        },
        points,
    }
}

/// How a scheme's fetch should fail, when failure is scripted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailKind {
    /// Ordinary upstream trouble (5xx)
    Transient,
    /// HTTP 429, the fatal kind
    RateLimit,
}

/// Scriptable upstream source
#[derive(Default)]
pub struct FakeSource {
    pub catalog: Mutex<Vec<CatalogEntry>>,
    pub histories: Mutex<HashMap<String, SchemeHistory>>,
    pub fetch_counts: Mutex<HashMap<String, u32>>,
    pub failures: Mutex<HashMap<String, FailKind>>,
    /// Artificial latency for `list_schemes`, for slot-contention tests
    pub list_delay: Mutex<Option<Duration>>,
}

impl FakeSource {
    pub fn with_catalog(entries: Vec<(&str, &str)>) -> Arc<Self> {
        let source = Self::default();
        *source.catalog.lock().unwrap() = entries
            .into_iter()
            .map(|(c, n)| CatalogEntry {
                scheme_code: code(c),
                scheme_name: n.to_string(),
            })
            .collect();
        Arc::new(source)
    }

    pub fn set_history(&self, scheme_code: &str, history: SchemeHistory) {
        self.histories
            .lock()
            .unwrap()
            .insert(scheme_code.to_string(), history);
    }

    pub fn set_failure(&self, scheme_code: &str, kind: FailKind) {
        self.failures
            .lock()
            .unwrap()
            .insert(scheme_code.to_string(), kind);
    }

    pub fn fetch_count(&self, scheme_code: &str) -> u32 {
        self.fetch_counts
            .lock()
            .unwrap()
            .get(scheme_code)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl IFundSource for FakeSource {
    async fn list_schemes(&self) -> anyhow::Result<Vec<CatalogEntry>> {
        let delay = *self.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.catalog.lock().unwrap().clone())
    }

    async fn fetch_scheme(&self, scheme_code: &SchemeCode) -> anyhow::Result<SchemeHistory> {
        *self
            .fetch_counts
            .lock()
            .unwrap()
            .entry(scheme_code.as_str().to_string())
            .or_insert(0) += 1;

        let failure = self.failures.lock().unwrap().get(scheme_code.as_str()).copied();
        match failure {
            Some(FailKind::Transient) => {
                return Err(MfapiError::Status {
                    status: 503,
                    path: format!("/{scheme_code}"),
                }
                .into())
            }
            Some(FailKind::RateLimit) => return Err(MfapiError::RateLimitBreach.into()),
            None => {}
        }

        Ok(self
            .histories
            .lock()
            .unwrap()
            .get(scheme_code.as_str())
            .cloned()
            .unwrap_or_else(|| history(scheme_code.as_str(), "Unscripted Fund", Vec::new())))
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

impl FakeSyncStateRepo {
    pub fn seed(&self, state: SyncState) {
        self.states
            .lock()
            .unwrap()
            .insert((state.scheme_code.as_str().to_string(), state.sync_type), state);
    }

    pub fn state_of(&self, scheme_code: &str, sync_type: SyncType) -> Option<SyncState> {
        self.states
            .lock()
            .unwrap()
            .get(&(scheme_code.to_string(), sync_type))
            .cloned()
    }
}

#[async_trait::async_trait]
impl ISyncStateRepository for FakeSyncStateRepo {
    async fn get(
        &self,
        scheme_code: &SchemeCode,
        sync_type: SyncType,
    ) -> anyhow::Result<Option<SyncState>> {
        Ok(self.state_of(scheme_code.as_str(), sync_type))
    }

    async fn upsert(&self, state: &SyncState) -> anyhow::Result<()> {
        self.seed(state.clone());
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

#[derive(Default)]
pub struct FakeAnalyticsRepo {
    pub rows: Mutex<HashMap<(String, Window), AnalyticsRow>>,
}

#[async_trait::async_trait]
impl IAnalyticsRepository for FakeAnalyticsRepo {
    async fn upsert(&self, row: &AnalyticsRow) -> anyhow::Result<()> {
        self.rows
            .lock()
            .unwrap()
            .insert((row.scheme_code.as_str().to_string(), row.window), row.clone());
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

    async fn rank(&self, _query: &RankQuery) -> anyhow::Result<Vec<RankedFund>> {
        Ok(Vec::new())
    }
}

/// Everything a pipeline test needs, wired over one fake set
pub struct Harness {
    pub orchestrator: Arc<PipelineOrchestrator>,
    pub source: Arc<FakeSource>,
    pub funds: Arc<FakeFundRepo>,
    pub navs: Arc<FakeNavRepo>,
    pub sync_states: Arc<FakeSyncStateRepo>,
    pub analytics: Arc<FakeAnalyticsRepo>,
    pub status: Arc<FakeStatusRepo>,
}

pub fn harness(source: Arc<FakeSource>) -> Harness {
    let funds = Arc::new(FakeFundRepo::default());
    let navs = Arc::new(FakeNavRepo::default());
    let sync_states = Arc::new(FakeSyncStateRepo::default());
    let analytics = Arc::new(FakeAnalyticsRepo::default());
    let status = Arc::new(FakeStatusRepo::default());

    let orchestrator = Arc::new(PipelineOrchestrator::new(
        Arc::clone(&source) as Arc<dyn IFundSource>,
        Arc::clone(&funds) as Arc<dyn IFundRepository>,
        Arc::clone(&navs) as Arc<dyn INavRepository>,
        Arc::clone(&sync_states) as Arc<dyn ISyncStateRepository>,
        Arc::clone(&analytics) as Arc<dyn IAnalyticsRepository>,
        Arc::clone(&status) as Arc<dyn IPipelineStatusRepository>,
    ));

    Harness {
        orchestrator,
        source,
        funds,
        navs,
        sync_states,
        analytics,
        status,
    }
}
