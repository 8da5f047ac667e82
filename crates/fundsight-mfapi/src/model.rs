//! Raw upstream payload shapes and normalization
//!
//! The upstream API has a few quirks this module absorbs so nothing else
//! has to know about them:
//!
//! - Scheme codes arrive as JSON numbers in the catalog but as strings in
//!   history metadata; both are accepted everywhere.
//! - Dates are `DD-MM-YYYY` strings.
//! - NAV values are decimal strings; the occasional `"0.00000"` or junk
//!   entry is dropped rather than failing the whole scheme.
//! - History is ordered newest-first; we hand out ascending-by-date.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use tracing::warn;

use fundsight_core::domain::NavPoint;

/// Upstream date format
const UPSTREAM_DATE_FORMAT: &str = "%d-%m-%Y";

/// Accept a scheme code as either a JSON number or a string
fn code_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum CodeRepr {
        Number(i64),
        Text(String),
    }

    Ok(match CodeRepr::deserialize(deserializer)? {
        CodeRepr::Number(n) => n.to_string(),
        CodeRepr::Text(s) => s,
    })
}

/// One catalog row as the upstream sends it
#[derive(Debug, Clone, Deserialize)]
pub struct RawCatalogEntry {
    #[serde(rename = "schemeCode", deserialize_with = "code_as_string")]
    pub scheme_code: String,
    #[serde(rename = "schemeName")]
    pub scheme_name: String,
}

/// Scheme metadata block of a history response
#[derive(Debug, Clone, Deserialize)]
pub struct RawMeta {
    #[serde(deserialize_with = "code_as_string")]
    pub scheme_code: String,
    pub scheme_name: String,
    pub fund_house: String,
    #[serde(default)]
    pub scheme_type: Option<String>,
    #[serde(default)]
    pub scheme_category: Option<String>,
}

/// One NAV observation as the upstream sends it
#[derive(Debug, Clone, Deserialize)]
pub struct RawNavEntry {
    pub date: String,
    pub nav: String,
}

/// Full history response: metadata plus newest-first observations
#[derive(Debug, Clone, Deserialize)]
pub struct RawHistory {
    pub meta: RawMeta,
    pub data: Vec<RawNavEntry>,
}

/// Parse an upstream `DD-MM-YYYY` date
pub fn parse_upstream_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), UPSTREAM_DATE_FORMAT).ok()
}

/// Normalize a raw newest-first history into an ascending NAV series
///
/// Entries with unparseable dates or values are skipped with a warning.
/// Duplicate dates collapse the way the idempotent store upsert would
/// collapse them: the entry closest to the head of the upstream array
/// (the newest-positioned duplicate) wins.
pub fn normalize_history(scheme_code: &str, raw: &[RawNavEntry]) -> Vec<NavPoint> {
    let mut by_date: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();

    // Walk oldest-first so later (newer-positioned) duplicates overwrite
    for entry in raw.iter().rev() {
        let Some(date) = parse_upstream_date(&entry.date) else {
            warn!(
                scheme_code,
                date = %entry.date,
                "Skipping history entry with unparseable date"
            );
            continue;
        };
        let Ok(nav) = Decimal::from_str(entry.nav.trim()) else {
            warn!(
                scheme_code,
                date = %entry.date,
                nav = %entry.nav,
                "Skipping history entry with unparseable NAV"
            );
            continue;
        };
        by_date.insert(date, nav);
    }

    by_date
        .into_iter()
        .map(|(date, nav)| NavPoint::new(date, nav))
        .collect()
}
