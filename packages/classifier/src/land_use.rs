//! Keyword classification of future land use designations.
//!
//! Comprehensive plan designations are descriptive phrases ("Low Density
//! Residential", "Commercial Activity Node") rather than short codes, and
//! most jurisdictions never publish a rule table for them. Keyword matching
//! is case-insensitive. Returns [`ZoneCategory::Other`] when nothing matches.

use zone_map_zoning_models::ZoneCategory;

/// Maps a free-text land use designation to a canonical category.
#[must_use]
pub fn classify_by_keyword(designation: &str) -> ZoneCategory {
    let lower = designation.to_lowercase();

    // ── Mixed use first: "mixed use residential" is not plain residential
    if contains_any(
        &lower,
        &["mixed use", "mixed-use", "town center", "village center", "activity center"],
    ) {
        return ZoneCategory::MixedUse;
    }

    if contains_any(
        &lower,
        &[
            "industrial",
            "manufactur",
            "warehouse",
            "distribution",
            "employment center",
        ],
    ) {
        return ZoneCategory::Industrial;
    }

    if contains_any(
        &lower,
        &["commercial", "retail", "office", "business", "activity node"],
    ) {
        return ZoneCategory::Commercial;
    }

    if contains_any(
        &lower,
        &[
            "institutional",
            "university",
            "school",
            "civic",
            "public",
            "government",
            "hospital",
        ],
    ) {
        return ZoneCategory::Institutional;
    }

    if contains_any(
        &lower,
        &["residential", "single family", "multi-family", "multifamily", "housing"],
    ) {
        return ZoneCategory::Residential;
    }

    ZoneCategory::Other
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}
