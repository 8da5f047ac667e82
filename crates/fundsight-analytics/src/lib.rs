//! Fundsight Analytics - windowed risk/return metrics
//!
//! Computes rolling-return distributions, rolling CAGR distributions, and
//! maximum drawdown over irregular daily NAV series (weekend and holiday
//! gaps) for the fixed windows 1Y/3Y/5Y/10Y.
//!
//! The math lives in pure functions over [`NavSeries`](series::NavSeries);
//! the [`AnalyticsEngine`](engine::AnalyticsEngine) wires them to the
//! persistence ports. Given identical inputs the output is bit-identical:
//! all sorting uses `f64::total_cmp` and no iteration order depends on
//! hashing.

pub mod drawdown;
pub mod engine;
pub mod returns;
pub mod series;
pub mod stats;

pub use engine::{AnalyticsEngine, SchemeOutcome};
pub use series::NavSeries;
