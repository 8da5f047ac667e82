//! Analytics engine
//!
//! Reads a scheme's persisted NAV series and fully recomputes its analytics
//! rows. Insufficient history is not an error: the window's row is simply
//! not written, and a stale row from an earlier computation is removed.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing::{debug, info};

use fundsight_core::domain::{AnalyticsRow, SchemeCode, Window};
use fundsight_core::ports::{IAnalyticsRepository, INavRepository};

use crate::drawdown::max_drawdown;
use crate::returns::{rolling_cagrs, rolling_returns};
use crate::series::NavSeries;
use crate::stats::distribution;

/// What a recomputation did for one scheme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemeOutcome {
    /// Windows whose row was written
    pub windows_written: u32,
    /// Windows skipped (and any stale row removed) for lack of history
    pub windows_skipped: u32,
}

/// Recomputes analytics rows from persisted NAV history
pub struct AnalyticsEngine {
    navs: Arc<dyn INavRepository>,
    analytics: Arc<dyn IAnalyticsRepository>,
}

impl AnalyticsEngine {
    pub fn new(navs: Arc<dyn INavRepository>, analytics: Arc<dyn IAnalyticsRepository>) -> Self {
        Self { navs, analytics }
    }

    /// Recompute every window for one scheme
    pub async fn recompute_scheme(&self, scheme_code: &SchemeCode) -> anyhow::Result<SchemeOutcome> {
        let points = self
            .navs
            .series(scheme_code)
            .await
            .with_context(|| format!("loading NAV series for {scheme_code}"))?;
        let series = NavSeries::from_points(&points);

        let mut outcome = SchemeOutcome::default();
        for window in Window::ALL {
            match compute_window(scheme_code, &series, window) {
                Some(row) => {
                    self.analytics
                        .upsert(&row)
                        .await
                        .with_context(|| format!("writing {window} analytics for {scheme_code}"))?;
                    outcome.windows_written += 1;
                }
                None => {
                    // Remove any row left over from when the scheme still
                    // qualified for this window.
                    self.analytics
                        .delete(scheme_code, window)
                        .await
                        .with_context(|| format!("clearing {window} analytics for {scheme_code}"))?;
                    outcome.windows_skipped += 1;
                }
            }
        }

        info!(
            scheme_code = %scheme_code,
            written = outcome.windows_written,
            skipped = outcome.windows_skipped,
            "Recomputed analytics"
        );
        Ok(outcome)
    }
}

/// Whether the series spans enough history for the window
///
/// Sufficient only when the span strictly exceeds 90% of the window; a
/// scheme with exactly `0.9 × W_days` of history does not qualify.
fn is_sufficient(series: &NavSeries, window: Window) -> bool {
    series.span_days() as f64 > 0.9 * window.days() as f64
}

/// Compute one analytics row, or `None` when history is insufficient
fn compute_window(scheme_code: &SchemeCode, series: &NavSeries, window: Window) -> Option<AnalyticsRow> {
    if !is_sufficient(series, window) {
        debug!(
            scheme_code = %scheme_code,
            window = %window,
            span_days = series.span_days(),
            "Insufficient history for window"
        );
        return None;
    }

    let mut returns = rolling_returns(series, window);
    let returns_dist = distribution(&mut returns)?;

    let mut cagrs = rolling_cagrs(series, window);
    let cagrs_dist = distribution(&mut cagrs)?;

    Some(AnalyticsRow {
        scheme_code: scheme_code.clone(),
        window,
        rolling_return_min: returns_dist.min,
        rolling_return_max: returns_dist.max,
        rolling_return_median: returns_dist.median,
        rolling_return_p25: returns_dist.p25,
        rolling_return_p75: returns_dist.p75,
        max_drawdown: max_drawdown(series),
        cagr_min: cagrs_dist.min,
        cagr_max: cagrs_dist.max,
        cagr_median: cagrs_dist.median,
        data_start_date: series.first_date()?,
        data_end_date: series.last_date()?,
        computed_at: Utc::now(),
    })
}
