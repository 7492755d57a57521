//! Neighborhood-only statistics over classified nearby parcels.

use std::collections::{BTreeMap, BTreeSet};

use zone_map_zoning_models::{ClassifiedParcel, PatternFlags, ZoneCategory};

/// Counts, diversity, and pattern flags for a set of nearby parcels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneSummary {
    /// Distinct non-empty raw zone codes.
    pub unique_zone_codes: BTreeSet<String>,
    /// Parcel count per non-empty raw zone code.
    pub zone_code_counts: BTreeMap<String, usize>,
    /// Parcel count per category.
    pub category_counts: BTreeMap<ZoneCategory, usize>,
    /// Number of parcels summarized.
    pub parcel_count: usize,
    /// See [`diversity_score`].
    pub diversity_score: f64,
    /// Derived pattern flags.
    pub pattern_flags: PatternFlags,
}

impl ZoneSummary {
    /// Number of parcels in `category`.
    #[must_use]
    pub fn count(&self, category: ZoneCategory) -> usize {
        self.category_counts.get(&category).copied().unwrap_or(0)
    }

    /// Number of commercial plus mixed-use parcels.
    #[must_use]
    pub fn commercial_count(&self) -> usize {
        self.count(ZoneCategory::Commercial) + self.count(ZoneCategory::MixedUse)
    }
}

/// Summarizes classified nearby parcels in one pass.
#[must_use]
pub fn summarize(parcels: &[ClassifiedParcel]) -> ZoneSummary {
    let mut zone_code_counts = BTreeMap::new();
    let mut category_counts = BTreeMap::new();

    for parcel in parcels {
        *category_counts.entry(parcel.category).or_insert(0) += 1;
        let code = parcel.record.raw_zone_code.trim();
        if !code.is_empty() {
            *zone_code_counts.entry(code.to_string()).or_insert(0) += 1;
        }
    }

    let unique_zone_codes: BTreeSet<String> = zone_code_counts.keys().cloned().collect();
    let count = |category: ZoneCategory| category_counts.get(&category).copied().unwrap_or(0);

    let pattern_flags = PatternFlags {
        residential_only: !parcels.is_empty()
            && count(ZoneCategory::Residential) == parcels.len(),
        mixed_use_nearby: count(ZoneCategory::MixedUse) > 0,
        commercial_nearby: count(ZoneCategory::Commercial) + count(ZoneCategory::MixedUse) > 0,
        industrial_nearby: count(ZoneCategory::Industrial) > 0,
    };

    ZoneSummary {
        diversity_score: diversity_score(unique_zone_codes.len(), parcels.len()),
        unique_zone_codes,
        zone_code_counts,
        category_counts,
        parcel_count: parcels.len(),
        pattern_flags,
    }
}

/// `unique / max(1, total)`, clamped to `[0, 1]`. Zero parcels scores `0`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn diversity_score(unique: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (unique as f64 / total as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use zone_map_zoning_models::{GeoPoint, ParcelZoningRecord};

    use super::*;

    fn parcel(id: &str, code: &str, category: ZoneCategory) -> ClassifiedParcel {
        ClassifiedParcel {
            record: ParcelZoningRecord {
                parcel_id: id.to_string(),
                raw_zone_code: code.to_string(),
                zone_description: None,
                future_land_use: None,
                area_acres: None,
                split_zoned: false,
                future_changed: false,
                location: GeoPoint::new(-79.2, 36.1),
            },
            category,
        }
    }

    #[test]
    fn empty_neighborhood_scores_zero() {
        let summary = summarize(&[]);
        assert!(summary.diversity_score.abs() < f64::EPSILON);
        assert!(!summary.diversity_score.is_nan());
        assert_eq!(summary.pattern_flags, PatternFlags::default());
        assert!(summary.unique_zone_codes.is_empty());
    }

    #[test]
    fn score_stays_in_unit_interval() {
        assert!((diversity_score(1, 1) - 1.0).abs() < f64::EPSILON);
        assert!((diversity_score(3, 1) - 1.0).abs() < f64::EPSILON);
        assert!((diversity_score(5, 200) - 0.025).abs() < 1e-12);
    }

    #[test]
    fn mixed_use_counts_as_commercial() {
        let summary = summarize(&[
            parcel("1", "MU-V", ZoneCategory::MixedUse),
            parcel("2", "RS-8", ZoneCategory::Residential),
        ]);
        assert!(summary.pattern_flags.mixed_use_nearby);
        assert!(summary.pattern_flags.commercial_nearby);
        assert!(!summary.pattern_flags.residential_only);
        assert!(!summary.pattern_flags.industrial_nearby);
        assert_eq!(summary.commercial_count(), 1);
    }

    #[test]
    fn empty_codes_are_not_distinct_zones() {
        let summary = summarize(&[
            parcel("1", "", ZoneCategory::Other),
            parcel("2", "RS-8", ZoneCategory::Residential),
            parcel("3", "RS-8", ZoneCategory::Residential),
        ]);
        assert_eq!(summary.unique_zone_codes.len(), 1);
        assert_eq!(summary.zone_code_counts["RS-8"], 2);
        assert_eq!(summary.count(ZoneCategory::Other), 1);
        assert_eq!(summary.parcel_count, 3);
    }
}
