//! Catalog discovery
//!
//! Filters the full upstream catalog (tens of thousands of schemes) down to
//! the tracked subset: direct-plan growth funds in the mid-cap and
//! small-cap categories from the recognized asset managers. The filter sets
//! are compile-time constants; tracking a new AMC is a code change, which
//! keeps the fund universe reviewable.

use std::collections::HashSet;

use tracing::{debug, info};

use fundsight_core::domain::Fund;
use fundsight_core::ports::CatalogEntry;

/// Recognized asset managers, canonical spelling first
///
/// Matching is case-insensitive substring against the scheme name; the
/// canonical spelling is what lands in the fund's `amc` column.
const RECOGNIZED_AMCS: &[&str] = &[
    "Motilal Oswal",
    "Edelweiss",
    "Nippon India",
    "HDFC",
    "SBI",
    "Axis",
    "Kotak",
    "Tata",
    "Quant",
    "PGIM India",
];

/// Tokens that place a scheme in the mid-cap category
///
/// AMCs spell it three ways ("Midcap", "Mid Cap", "Mid-Cap"), so all
/// spellings are recognized.
const MID_CAP_TOKENS: &[&str] = &["mid cap", "midcap", "mid-cap"];

/// Tokens that place a scheme in the small-cap category
const SMALL_CAP_TOKENS: &[&str] = &["small cap", "smallcap", "small-cap"];

/// Tokens every tracked scheme must carry
const MANDATORY_TOKENS: &[&str] = &["direct", "growth"];

/// Category labels as persisted
const MID_CAP_LABEL: &str = "Mid Cap Direct Growth";
const SMALL_CAP_LABEL: &str = "Small Cap Direct Growth";

/// First recognized AMC whose name appears in the scheme name
fn match_amc(name_lower: &str) -> Option<&'static str> {
    RECOGNIZED_AMCS
        .iter()
        .find(|amc| name_lower.contains(&amc.to_lowercase()))
        .copied()
}

/// Category label derived from token inspection, `None` when neither set hits
fn categorize(name_lower: &str) -> Option<&'static str> {
    if MID_CAP_TOKENS.iter().any(|t| name_lower.contains(t)) {
        Some(MID_CAP_LABEL)
    } else if SMALL_CAP_TOKENS.iter().any(|t| name_lower.contains(t)) {
        Some(SMALL_CAP_LABEL)
    } else {
        None
    }
}

fn has_mandatory_tokens(name_lower: &str) -> bool {
    MANDATORY_TOKENS.iter().all(|t| name_lower.contains(t))
}

/// Filter the catalog to the tracked subset
///
/// A scheme qualifies iff its name contains a recognized AMC, a category
/// token, and every mandatory token. Output is deduplicated by scheme code
/// and keeps catalog order.
pub fn filter_catalog(catalog: &[CatalogEntry]) -> Vec<Fund> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut discovered = Vec::new();

    for entry in catalog {
        if !seen.insert(entry.scheme_code.as_str()) {
            continue;
        }

        let name_lower = entry.scheme_name.to_lowercase();
        if !has_mandatory_tokens(&name_lower) {
            continue;
        }
        let Some(amc) = match_amc(&name_lower) else {
            continue;
        };
        let Some(category) = categorize(&name_lower) else {
            continue;
        };

        debug!(
            scheme_code = %entry.scheme_code,
            amc,
            category,
            "Discovered scheme"
        );
        discovered.push(Fund::discovered(
            entry.scheme_code.clone(),
            entry.scheme_name.clone(),
            amc,
            category,
        ));
    }

    info!(
        catalog = catalog.len(),
        discovered = discovered.len(),
        "Catalog discovery finished"
    );
    discovered
}
