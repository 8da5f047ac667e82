//! NAV observation value type

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single Net Asset Value observation for a scheme
///
/// At most one NAV exists per scheme per calendar date. Values are carried
/// as fixed-point decimals end-to-end and only lowered to `f64` inside the
/// analytics engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavPoint {
    /// Publication date (ISO calendar date)
    pub date: NaiveDate,
    /// Net asset value per unit
    pub nav: Decimal,
}

impl NavPoint {
    pub fn new(date: NaiveDate, nav: Decimal) -> Self {
        Self { date, nav }
    }
}
