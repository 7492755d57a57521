#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical zoning categories, parcel records, and neighborhood analysis
//! types.
//!
//! Every jurisdiction names its zoning districts differently. The types in
//! this crate are the shared vocabulary that all jurisdiction-specific data
//! is normalized into before analysis, and the serializable result handed
//! to display and text-generation layers.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Canonical zoning category that raw jurisdiction codes are mapped into.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ZoneCategory {
    /// Single-family, multi-family, and manufactured housing districts
    Residential,
    /// Retail, office, and general business districts
    Commercial,
    /// Light and heavy industrial, warehousing, manufacturing
    Industrial,
    /// Districts permitting both residential and commercial uses
    MixedUse,
    /// Schools, government, hospitals, universities
    Institutional,
    /// Agricultural, open space, or codes that could not be classified
    Other,
}

impl ZoneCategory {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Residential,
            Self::Commercial,
            Self::Industrial,
            Self::MixedUse,
            Self::Institutional,
            Self::Other,
        ]
    }

    /// Human-readable label used in concern text.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Residential => "residential",
            Self::Commercial => "commercial",
            Self::Industrial => "industrial",
            Self::MixedUse => "mixed-use",
            Self::Institutional => "institutional",
            Self::Other => "other",
        }
    }
}

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Latitude in decimal degrees.
    pub latitude: f64,
}

impl GeoPoint {
    /// Creates a point from longitude/latitude (x/y order).
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Returns `true` if both coordinates are finite and within WGS84
    /// bounds.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
            && (-90.0..=90.0).contains(&self.latitude)
    }
}

/// A parcel's zoning attributes, normalized from a jurisdiction-specific
/// schema.
///
/// Identity is [`parcel_id`](Self::parcel_id): two records with the same id
/// describe the same parcel regardless of which query returned them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParcelZoningRecord {
    /// Jurisdiction parcel identifier (PIN, APN, etc.).
    pub parcel_id: String,
    /// Zoning code exactly as the jurisdiction publishes it (trimmed).
    pub raw_zone_code: String,
    /// Descriptive name of the zoning district, if published.
    pub zone_description: Option<String>,
    /// Future land use / comprehensive plan designation, if published.
    pub future_land_use: Option<String>,
    /// Parcel area in acres.
    pub area_acres: Option<f64>,
    /// Whether more than one zoning district applies to the parcel.
    pub split_zoned: bool,
    /// Whether the future land use designation was recently amended.
    pub future_changed: bool,
    /// Representative location (centroid or query point).
    pub location: GeoPoint,
}

/// A parcel record together with its canonical category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedParcel {
    /// The normalized parcel record.
    #[serde(flatten)]
    pub record: ParcelZoningRecord,
    /// Canonical category of [`ParcelZoningRecord::raw_zone_code`].
    pub category: ZoneCategory,
}

/// Outcome of the current-parcel lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectStatus {
    /// A parcel contains the point.
    Found,
    /// The point is valid but no parcel contains it (road, water).
    NotFound,
    /// The data source failed or timed out.
    Unavailable,
}

/// Nearby parcels, or an explicit marker that they could not be fetched.
///
/// `Unavailable` must never be collapsed into an empty list: an empty list
/// means "no parcels within the radius", which is a different fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NearbyParcels {
    /// The fetch succeeded (possibly with zero parcels).
    Available {
        /// Nearby parcels, sorted by parcel id, never including the subject.
        parcels: Vec<ClassifiedParcel>,
    },
    /// The fetch failed or timed out.
    Unavailable {
        /// Why the data is missing.
        reason: String,
    },
}

impl NearbyParcels {
    /// Returns the parcels if the fetch succeeded.
    #[must_use]
    pub fn parcels(&self) -> Option<&[ClassifiedParcel]> {
        match self {
            Self::Available { parcels } => Some(parcels),
            Self::Unavailable { .. } => None,
        }
    }

    /// Returns `true` if the nearby fetch failed.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Boolean neighborhood summaries derived from nearby parcel categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternFlags {
    /// At least one nearby parcel, and all of them residential.
    pub residential_only: bool,
    /// At least one nearby mixed-use parcel.
    pub mixed_use_nearby: bool,
    /// At least one nearby commercial or mixed-use parcel.
    pub commercial_nearby: bool,
    /// At least one nearby industrial parcel.
    pub industrial_nearby: bool,
}

/// Complete neighborhood zoning analysis for one point.
///
/// Plain data: suitable for direct JSON serialization, display formatting,
/// or use as structured prompt input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborhoodAnalysis {
    /// Jurisdiction whose data and rules were used.
    pub jurisdiction_id: String,
    /// Human-readable jurisdiction name.
    pub jurisdiction_name: String,
    /// Set when the point fell inside a town whose boundary is only a
    /// placeholder, so the county was used instead.
    pub unverified: bool,
    /// The analyzed point.
    pub point: GeoPoint,
    /// Search radius used for nearby parcels.
    pub radius_meters: f64,
    /// Outcome of the current-parcel lookup.
    pub subject_status: SubjectStatus,
    /// The parcel containing the point, if found.
    pub subject_parcel: Option<ClassifiedParcel>,
    /// Parcels within the radius, excluding the subject.
    pub nearby_parcels: NearbyParcels,
    /// Distinct raw zone codes among nearby parcels.
    pub unique_zone_codes: BTreeSet<String>,
    /// Nearby parcel count per raw zone code.
    pub zone_code_counts: BTreeMap<String, usize>,
    /// Nearby parcel count per canonical category.
    pub category_counts: BTreeMap<ZoneCategory, usize>,
    /// `|unique_zone_codes| / max(1, |nearby|)`, always in `[0, 1]`.
    pub diversity_score: f64,
    /// Neighborhood pattern flags.
    pub pattern_flags: PatternFlags,
    /// Rule-derived compatibility concerns.
    pub concerns: Vec<String>,
}

impl NeighborhoodAnalysis {
    /// Returns `true` if any part of the analysis is missing because a data
    /// source failed. Callers must show a visible indicator in that case.
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        self.nearby_parcels.is_unavailable()
            || matches!(self.subject_status, SubjectStatus::Unavailable)
    }
}
