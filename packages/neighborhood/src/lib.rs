#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Neighborhood zoning analysis.
//!
//! Given the jurisdiction governing a point, fetches the parcel under the
//! point and the parcels around it, classifies both with the
//! jurisdiction's own vocabulary, and summarizes the neighborhood into a
//! diversity score, pattern flags, and rule-derived compatibility concerns.
//!
//! A missing subject parcel or unavailable nearby data degrades the result
//! instead of failing it. Only foundational problems (an unknown
//! jurisdiction, an invalid point or radius) are errors.

pub mod concerns;
pub mod summary;

use std::time::Duration;

use thiserror::Error;
use zone_map_jurisdiction::{
    JurisdictionConfig, JurisdictionError, JurisdictionRegistry, Resolution,
};
use zone_map_parcel::{ParcelSource, dedupe_by_id};
use zone_map_zoning_models::{
    ClassifiedParcel, GeoPoint, NearbyParcels, NeighborhoodAnalysis, ParcelZoningRecord,
    SubjectStatus,
};

use crate::concerns::{ConcernInputs, Subject};

/// Default search radius, roughly two to three city blocks.
pub const DEFAULT_RADIUS_METERS: f64 = 250.0;

/// Default per-fetch time budget.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Default distinct-zone count for the high-diversity concern.
pub const DEFAULT_HIGH_DIVERSITY_ZONE_COUNT: usize = 5;

/// Errors that prevent an analysis from being produced at all.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Jurisdiction lookup or resolution failed.
    #[error(transparent)]
    Jurisdiction(#[from] JurisdictionError),

    /// Options cannot produce a meaningful analysis.
    #[error("Invalid analysis options: {message}")]
    InvalidOptions {
        /// Description of what went wrong.
        message: String,
    },
}

/// Caller-supplied analysis policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisOptions {
    /// Radius for the nearby-parcel query.
    pub radius_meters: f64,
    /// Time budget for each of the two parcel fetches.
    pub fetch_timeout: Duration,
    /// Distinct-zone count at which the high-diversity concern fires.
    pub high_diversity_zone_count: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            radius_meters: DEFAULT_RADIUS_METERS,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            high_diversity_zone_count: DEFAULT_HIGH_DIVERSITY_ZONE_COUNT,
        }
    }
}

impl AnalysisOptions {
    /// Checks that the options are usable.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidOptions`] for a non-positive or
    /// non-finite radius, a zero timeout, or a zero zone threshold.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let invalid = |message: String| Err(AnalysisError::InvalidOptions { message });
        if !self.radius_meters.is_finite() || self.radius_meters <= 0.0 {
            return invalid(format!(
                "radius must be a positive number of meters, got {}",
                self.radius_meters
            ));
        }
        if self.fetch_timeout.is_zero() {
            return invalid("fetch timeout must be greater than zero".to_string());
        }
        if self.high_diversity_zone_count == 0 {
            return invalid("high-diversity zone count must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Stateless analyzer over a jurisdiction registry and a parcel source.
pub struct NeighborhoodAnalyzer<'a, S> {
    registry: &'a JurisdictionRegistry,
    source: S,
}

impl<'a, S: ParcelSource> NeighborhoodAnalyzer<'a, S> {
    /// Creates an analyzer.
    pub const fn new(registry: &'a JurisdictionRegistry, source: S) -> Self {
        Self { registry, source }
    }

    /// Analyzes the neighborhood around `point` using the resolved
    /// jurisdiction's data source and vocabulary.
    ///
    /// The result's `unverified` marker is taken from `resolution`, so a
    /// point that fell inside a placeholder town stays flagged.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] if the jurisdiction is not configured, the
    /// point is invalid, or the options are unusable. Data source failures
    /// are not errors; they produce a partial analysis.
    pub async fn analyze(
        &self,
        resolution: &Resolution,
        point: GeoPoint,
        options: &AnalysisOptions,
    ) -> Result<NeighborhoodAnalysis, AnalysisError> {
        let config = self.registry.get(&resolution.jurisdiction.id)?;
        self.run(config, resolution.unverified, point, options)
            .await
    }

    async fn run(
        &self,
        config: &JurisdictionConfig,
        unverified: bool,
        point: GeoPoint,
        options: &AnalysisOptions,
    ) -> Result<NeighborhoodAnalysis, AnalysisError> {
        options.validate()?;
        if !point.is_valid() {
            return Err(JurisdictionError::UnsupportedLocation {
                longitude: point.longitude,
                latitude: point.latitude,
            }
            .into());
        }

        let fetch = self
            .source
            .fetch_neighborhood(config, point, options.radius_meters, options.fetch_timeout)
            .await;

        let (subject_status, subject_parcel) = match fetch.current {
            Ok(Some(record)) => (SubjectStatus::Found, Some(classify(config, record))),
            Ok(None) => {
                log::info!(
                    "{}: no parcel at ({}, {}); analyzing neighborhood only",
                    config.id(),
                    point.longitude,
                    point.latitude
                );
                (SubjectStatus::NotFound, None)
            }
            Err(e) => {
                log::warn!("{}: current parcel unavailable: {e}", config.id());
                (SubjectStatus::Unavailable, None)
            }
        };

        let nearby_parcels = match fetch.nearby {
            Ok(records) => NearbyParcels::Available {
                parcels: dedupe_by_id(records)
                    .into_iter()
                    .map(|record| classify(config, record))
                    .collect(),
            },
            Err(e) => {
                log::warn!("{}: nearby parcels unavailable: {e}", config.id());
                NearbyParcels::Unavailable {
                    reason: e.to_string(),
                }
            }
        };

        let summary = summary::summarize(nearby_parcels.parcels().unwrap_or_default());

        let subject = subject_parcel.as_ref().map(|parcel| Subject {
            parcel,
            future_category: parcel
                .record
                .future_land_use
                .as_deref()
                .map(|designation| config.vocabulary().classify_future_land_use(designation)),
        });

        let concerns = concerns::evaluate(&ConcernInputs {
            subject,
            nearby: nearby_parcels.parcels().map(|_| &summary),
            radius_meters: options.radius_meters,
            high_diversity_zone_count: options.high_diversity_zone_count,
        });

        log::debug!(
            "{}: {} nearby, {} zones, score {:.4}, {} concerns",
            config.id(),
            summary.parcel_count,
            summary.unique_zone_codes.len(),
            summary.diversity_score,
            concerns.len()
        );

        Ok(NeighborhoodAnalysis {
            jurisdiction_id: config.id().to_string(),
            jurisdiction_name: config.name().to_string(),
            unverified,
            point,
            radius_meters: options.radius_meters,
            subject_status,
            subject_parcel,
            nearby_parcels,
            unique_zone_codes: summary.unique_zone_codes,
            zone_code_counts: summary.zone_code_counts,
            category_counts: summary.category_counts,
            diversity_score: summary.diversity_score,
            pattern_flags: summary.pattern_flags,
            concerns,
        })
    }
}

fn classify(config: &JurisdictionConfig, record: ParcelZoningRecord) -> ClassifiedParcel {
    let category = config.vocabulary().classify_zone(&record.raw_zone_code);
    ClassifiedParcel { record, category }
}
