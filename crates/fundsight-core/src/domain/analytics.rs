//! Analytics windows and precomputed analytics rows

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::SchemeCode;

/// Fixed look-back window for rolling metrics
///
/// Windows are measured as `365 × years` calendar days; leap days are
/// deliberately ignored so that window arithmetic stays integral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Window {
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "3Y")]
    ThreeYears,
    #[serde(rename = "5Y")]
    FiveYears,
    #[serde(rename = "10Y")]
    TenYears,
}

impl Window {
    /// All windows, in ascending order
    pub const ALL: [Window; 4] = [
        Window::OneYear,
        Window::ThreeYears,
        Window::FiveYears,
        Window::TenYears,
    ];

    /// Integer year count (the CAGR exponent denominator)
    #[must_use]
    pub fn years(&self) -> u32 {
        match self {
            Self::OneYear => 1,
            Self::ThreeYears => 3,
            Self::FiveYears => 5,
            Self::TenYears => 10,
        }
    }

    /// Window length in calendar days (`365 × years`)
    #[must_use]
    pub fn days(&self) -> i64 {
        365 * i64::from(self.years())
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneYear => "1Y",
            Self::ThreeYears => "3Y",
            Self::FiveYears => "5Y",
            Self::TenYears => "10Y",
        }
    }
}

impl Display for Window {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Window {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1Y" => Ok(Self::OneYear),
            "3Y" => Ok(Self::ThreeYears),
            "5Y" => Ok(Self::FiveYears),
            "10Y" => Ok(Self::TenYears),
            other => Err(DomainError::UnknownVariant {
                kind: "window",
                value: other.to_string(),
            }),
        }
    }
}

/// Precomputed analytics for one `(scheme, window)` pair
///
/// Fully recomputed after each ingestion. No row exists for a window the
/// scheme lacks sufficient history for; stale rows are removed when a
/// scheme drops below the sufficiency threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsRow {
    pub scheme_code: SchemeCode,
    pub window: Window,
    /// Rolling simple-return distribution (raw fractions, not percent)
    pub rolling_return_min: f64,
    pub rolling_return_max: f64,
    pub rolling_return_median: f64,
    pub rolling_return_p25: f64,
    pub rolling_return_p75: f64,
    /// Largest peak-to-trough decline over the full history (≤ 0)
    pub max_drawdown: f64,
    /// Rolling CAGR distribution (raw fractions)
    pub cagr_min: f64,
    pub cagr_max: f64,
    pub cagr_median: f64,
    /// First and last NAV dates the computation saw
    pub data_start_date: NaiveDate,
    pub data_end_date: NaiveDate,
    pub computed_at: DateTime<Utc>,
}
