//! Port definitions (hexagonal architecture)
//!
//! Async traits at the seams of the system. Adapter crates provide the
//! concrete implementations; the pipeline, analytics engine, and API only
//! ever see these traits.

pub mod fund_source;
pub mod repositories;

pub use fund_source::{CatalogEntry, IFundSource, SchemeHistory, SchemeMeta};
pub use repositories::{
    FundFilter, IAnalyticsRepository, IFundRepository, INavRepository, IPipelineStatusRepository,
    ISyncStateRepository, RankMetric, RankQuery, RankedFund,
};
