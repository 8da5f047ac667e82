//! Date-indexed NAV series with gap-tolerant lookup

use std::collections::HashMap;

use chrono::{Days, NaiveDate};
use rust_decimal::prelude::ToPrimitive;

use fundsight_core::domain::NavPoint;

/// How many days past a missing date the lookup probes forward
///
/// Absorbs weekends and public holidays; anything longer is treated as a
/// genuine hole rather than synthesized over.
pub const GAP_PROBE_DAYS: u64 = 5;

/// An ascending-by-date NAV series for one scheme
///
/// Values are lowered to `f64` once, on construction; everything downstream
/// is plain float math.
#[derive(Debug, Clone)]
pub struct NavSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
    index: HashMap<NaiveDate, usize>,
}

impl NavSeries {
    /// Build a series from date-unique points
    ///
    /// Input need not be ordered; it is sorted here. The store's unique key
    /// guarantees at most one point per date.
    #[must_use]
    pub fn from_points(points: &[NavPoint]) -> Self {
        let mut points: Vec<&NavPoint> = points.iter().collect();
        points.sort_by_key(|p| p.date);

        let mut dates = Vec::with_capacity(points.len());
        let mut values = Vec::with_capacity(points.len());
        let mut index = HashMap::with_capacity(points.len());
        for point in points {
            index.insert(point.date, dates.len());
            dates.push(point.date);
            values.push(point.nav.to_f64().unwrap_or(0.0));
        }
        Self {
            dates,
            values,
            index,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    #[must_use]
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    #[must_use]
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Calendar days between the first and last observation
    #[must_use]
    pub fn span_days(&self) -> i64 {
        match (self.first_date(), self.last_date()) {
            (Some(first), Some(last)) => (last - first).num_days(),
            _ => 0,
        }
    }

    #[must_use]
    pub fn date_at(&self, i: usize) -> NaiveDate {
        self.dates[i]
    }

    #[must_use]
    pub fn value_at(&self, i: usize) -> f64 {
        self.values[i]
    }

    /// NAV on exactly `date`, if observed
    #[must_use]
    pub fn exact(&self, date: NaiveDate) -> Option<f64> {
        self.index.get(&date).map(|&i| self.values[i])
    }

    /// Gap-tolerant lookup: the first NAV on `date..=date+5`
    #[must_use]
    pub fn probe(&self, date: NaiveDate) -> Option<f64> {
        (0..=GAP_PROBE_DAYS)
            .filter_map(|offset| date.checked_add_days(Days::new(offset)))
            .find_map(|candidate| self.exact(candidate))
    }
}
