//! Rolling return and rolling CAGR samples

use chrono::Days;

use fundsight_core::domain::Window;

use crate::series::NavSeries;

/// Simple return over a window: `(now − past) / past`
#[must_use]
pub fn simple_return(past: f64, now: f64) -> f64 {
    (now - past) / past
}

/// Annualized return over `years`: `(now / past)^(1/years) − 1`
#[must_use]
pub fn cagr(past: f64, now: f64, years: u32) -> f64 {
    (now / past).powf(1.0 / f64::from(years)) - 1.0
}

/// Rolling simple returns, sampled at every observation
///
/// For each point, the look-back date is `date − W_days`; a NAV is searched
/// there with the gap-tolerant probe. Observations whose look-back lands
/// before the history starts (or in a hole longer than the probe) simply
/// contribute no sample. A probed NAV of zero or less is a corrupt base
/// value and contributes no sample either; it would otherwise inject
/// infinities into the return distribution and NaNs into the CAGRs.
#[must_use]
pub fn rolling_returns(series: &NavSeries, window: Window) -> Vec<f64> {
    rolling_samples(series, window, |past, now, _years| simple_return(past, now))
}

/// Rolling CAGRs with the same indexing as [`rolling_returns`]
#[must_use]
pub fn rolling_cagrs(series: &NavSeries, window: Window) -> Vec<f64> {
    rolling_samples(series, window, |past, now, years| cagr(past, now, years))
}

fn rolling_samples(
    series: &NavSeries,
    window: Window,
    metric: impl Fn(f64, f64, u32) -> f64,
) -> Vec<f64> {
    let lookback = Days::new(window.days() as u64);
    let years = window.years();

    let mut samples = Vec::new();
    for i in 0..series.len() {
        let Some(target) = series.date_at(i).checked_sub_days(lookback) else {
            continue;
        };
        if let Some(past) = series.probe(target) {
            // A non-positive base NAV cannot anchor a return
            if past > 0.0 {
                samples.push(metric(past, series.value_at(i), years));
            }
        }
    }
    samples
}
