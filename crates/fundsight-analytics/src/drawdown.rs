//! Maximum drawdown

use crate::series::NavSeries;

/// Largest peak-to-trough proportional decline over the whole series
///
/// Single left-to-right sweep: track the running peak and the most
/// negative `(nav − peak) / peak` seen. Returns a value ≤ 0; exactly 0 for
/// monotonically non-decreasing (or empty) series.
///
/// Deliberately computed over the full available history rather than the
/// requested window, so all windows of a scheme report the same figure.
#[must_use]
pub fn max_drawdown(series: &NavSeries) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0f64;

    for i in 0..series.len() {
        let nav = series.value_at(i);
        if nav > peak {
            peak = nav;
        } else if peak > 0.0 {
            worst = worst.min((nav - peak) / peak);
        }
    }
    worst
}
