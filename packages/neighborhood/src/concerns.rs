//! Compatibility concern rules.
//!
//! Every matching rule fires, in a fixed order. Messages are built only
//! from parcel data and counts, never from user input.

use zone_map_zoning_models::{ClassifiedParcel, ZoneCategory};

use crate::summary::ZoneSummary;

/// The subject parcel and the category of its future land use designation.
#[derive(Debug, Clone, Copy)]
pub struct Subject<'a> {
    /// The classified subject parcel.
    pub parcel: &'a ClassifiedParcel,
    /// Category of the future land use designation, if one is published.
    pub future_category: Option<ZoneCategory>,
}

/// Inputs to [`evaluate`].
#[derive(Debug, Clone, Copy)]
pub struct ConcernInputs<'a> {
    /// The subject, absent in degraded mode.
    pub subject: Option<Subject<'a>>,
    /// Nearby summary, absent when nearby data is unavailable.
    pub nearby: Option<&'a ZoneSummary>,
    /// Radius the nearby parcels were gathered within.
    pub radius_meters: f64,
    /// Distinct-zone count at which the high-diversity concern fires.
    pub high_diversity_zone_count: usize,
}

/// Evaluates all concern rules.
#[must_use]
pub fn evaluate(inputs: &ConcernInputs<'_>) -> Vec<String> {
    let mut concerns = Vec::new();
    let radius = inputs.radius_meters;

    let residential_subject = inputs
        .subject
        .is_some_and(|s| s.parcel.category == ZoneCategory::Residential);

    if let Some(nearby) = inputs.nearby {
        if residential_subject && nearby.pattern_flags.commercial_nearby {
            let n = nearby.commercial_count();
            concerns.push(format!(
                "{n} commercial or mixed-use {} within {radius} m of this residential parcel; \
                 expect added traffic and noise",
                parcels(n)
            ));
        }

        if residential_subject && nearby.pattern_flags.industrial_nearby {
            let n = nearby.count(ZoneCategory::Industrial);
            concerns.push(format!(
                "{n} industrial {} within {radius} m of this residential parcel; \
                 possible pollution and noise exposure",
                parcels(n)
            ));
        }

        let zones = nearby.unique_zone_codes.len();
        if zones >= inputs.high_diversity_zone_count {
            concerns.push(format!(
                "High zoning diversity: {zones} distinct zones within {radius} m \
                 suggests a transitional neighborhood"
            ));
        }
    }

    if let Some(subject) = inputs.subject {
        let record = &subject.parcel.record;

        if let (Some(designation), Some(future)) =
            (record.future_land_use.as_deref(), subject.future_category)
            && future != ZoneCategory::Other
            && future != subject.parcel.category
        {
            concerns.push(format!(
                "Future land use '{designation}' ({}) differs from current {} zoning '{}'; \
                 redevelopment risk",
                future.label(),
                subject.parcel.category.label(),
                record.raw_zone_code
            ));
        }

        if record.future_changed {
            concerns.push(match record.future_land_use.as_deref() {
                Some(designation) => format!(
                    "Future land use designation was recently amended to '{designation}'; \
                     the area is in planning transition"
                ),
                None => "Future land use designation was recently amended; \
                         the area is in planning transition"
                    .to_string(),
            });
        }

        if record.split_zoned {
            concerns.push(format!(
                "Parcel is split-zoned ('{}'); more than one district's regulations apply",
                record.raw_zone_code
            ));
        }
    }

    concerns
}

const fn parcels(n: usize) -> &'static str {
    if n == 1 { "parcel" } else { "parcels" }
}

#[cfg(test)]
mod tests {
    use zone_map_zoning_models::{GeoPoint, ParcelZoningRecord};

    use super::*;
    use crate::summary::summarize;

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

    fn inputs<'a>(
        subject: Option<Subject<'a>>,
        nearby: Option<&'a ZoneSummary>,
    ) -> ConcernInputs<'a> {
        ConcernInputs {
            subject,
            nearby,
            radius_meters: 250.0,
            high_diversity_zone_count: 5,
        }
    }

    #[test]
    fn commercial_concern_cites_exact_count() {
        let home = parcel("S", "RS-8", ZoneCategory::Residential);
        let nearby = summarize(&[
            parcel("1", "C-G", ZoneCategory::Commercial),
            parcel("2", "C-G", ZoneCategory::Commercial),
            parcel("3", "MU-V", ZoneCategory::MixedUse),
            parcel("4", "RS-8", ZoneCategory::Residential),
        ]);
        let subject = Subject {
            parcel: &home,
            future_category: None,
        };

        let concerns = evaluate(&inputs(Some(subject), Some(&nearby)));
        assert_eq!(concerns.len(), 1);
        assert!(concerns[0].starts_with("3 commercial or mixed-use parcels within 250 m"));
    }

    #[test]
    fn commercial_subject_has_no_proximity_concern() {
        let shop = parcel("S", "C-G", ZoneCategory::Commercial);
        let nearby = summarize(&[
            parcel("1", "C-G", ZoneCategory::Commercial),
            parcel("2", "I-1", ZoneCategory::Industrial),
        ]);
        let subject = Subject {
            parcel: &shop,
            future_category: None,
        };
        assert!(evaluate(&inputs(Some(subject), Some(&nearby))).is_empty());
    }

    #[test]
    fn industrial_concern_for_residential_subject() {
        let home = parcel("S", "R-1", ZoneCategory::Residential);
        let nearby = summarize(&[parcel("1", "I-1", ZoneCategory::Industrial)]);
        let subject = Subject {
            parcel: &home,
            future_category: None,
        };
        let concerns = evaluate(&inputs(Some(subject), Some(&nearby)));
        assert_eq!(concerns.len(), 1);
        assert!(concerns[0].starts_with("1 industrial parcel within 250 m"));
        assert!(concerns[0].contains("pollution"));
    }

    #[test]
    fn diversity_concern_without_subject() {
        let nearby: Vec<_> = (0..200)
            .map(|i| {
                let code = ["R-1", "R-2", "RS-8", "RM-1", "AR"][i % 5];
                parcel(&format!("P{i:03}"), code, ZoneCategory::Residential)
            })
            .collect();
        let summary = summarize(&nearby);
        assert!((summary.diversity_score - 0.025).abs() < 1e-12);

        let concerns = evaluate(&inputs(None, Some(&summary)));
        assert_eq!(concerns.len(), 1);
        assert!(concerns[0].contains("5 distinct zones"));
    }

    #[test]
    fn subject_rules_fire_together() {
        let mut home = parcel("S", "RS-8/C-G", ZoneCategory::Residential);
        home.record.future_land_use = Some("Commercial Activity Node".to_string());
        home.record.future_changed = true;
        home.record.split_zoned = true;
        let subject = Subject {
            parcel: &home,
            future_category: Some(ZoneCategory::Commercial),
        };

        let concerns = evaluate(&inputs(Some(subject), None));
        assert_eq!(concerns.len(), 3);
        assert!(concerns[0].contains("'Commercial Activity Node' (commercial)"));
        assert!(concerns[0].contains("current residential zoning 'RS-8/C-G'"));
        assert!(concerns[1].contains("planning transition"));
        assert!(concerns[2].contains("split-zoned ('RS-8/C-G')"));
    }

    #[test]
    fn matching_or_unclassified_future_land_use_is_quiet() {
        let mut home = parcel("S", "RS-8", ZoneCategory::Residential);
        home.record.future_land_use = Some("Rural Buffer".to_string());
        for future_category in [Some(ZoneCategory::Residential), Some(ZoneCategory::Other), None] {
            let subject = Subject {
                parcel: &home,
                future_category,
            };
            assert!(evaluate(&inputs(Some(subject), None)).is_empty());
        }
    }
}
