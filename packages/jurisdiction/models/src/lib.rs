#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Jurisdiction definition types.
//!
//! Defines the TOML schema for a governing jurisdiction (a county or an
//! incorporated town): where its boundary comes from, which endpoint serves
//! its parcel data, what its parcel fields are called, and how its zoning
//! codes map onto the canonical [`ZoneCategory`] taxonomy.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use zone_map_zoning_models::ZoneCategory;

/// A jurisdiction definition, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JurisdictionSource {
    /// Unique identifier (e.g., `"orange_county_nc"`).
    pub id: String,
    /// Human-readable name (e.g., "Orange County").
    pub name: String,
    /// County or incorporated town.
    pub kind: JurisdictionKind,
    /// Two-letter state abbreviation.
    pub state: String,
    /// Id of the county a town lies within. Required for towns.
    #[serde(default)]
    pub parent: Option<String>,
    /// Supported region `[west, south, east, north]` for a county. Points
    /// outside every county's region are unsupported.
    #[serde(default)]
    pub coverage_bbox: Option<[f64; 4]>,
    /// Where a town's boundary polygon comes from. Counties have none.
    #[serde(default)]
    pub boundary: Option<BoundarySource>,
    /// How to query the jurisdiction's parcel data.
    pub fetcher: ParcelFetcherConfig,
    /// Parcel attribute names in this jurisdiction's schema.
    pub fields: ParcelFieldMapping,
    /// Optional attributes this jurisdiction publishes.
    #[serde(default)]
    pub features: FeatureFlags,
    /// Ordered zoning code rules, most specific first.
    pub classification: Vec<ClassificationRuleDef>,
    /// Ordered future land use rules. When empty, future land use text is
    /// classified by keyword.
    #[serde(default)]
    pub future_land_use: Vec<ClassificationRuleDef>,
}

impl JurisdictionSource {
    /// Returns the jurisdiction identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the human-readable jurisdiction name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Level of government.
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
pub enum JurisdictionKind {
    /// Catch-all fallback for points outside every town.
    County,
    /// Incorporated town or city with its own zoning ordinance.
    IncorporatedTown,
}

/// Where a town boundary polygon is loaded from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoundarySource {
    /// `ArcGIS` query endpoint returning the boundary as `GeoJSON`, fetched
    /// once at startup.
    Arcgis {
        /// Base query URL (up to `.../query`).
        url: String,
        /// Optional `where` clause selecting the town's feature.
        where_clause: Option<String>,
    },
    /// Boundary not yet surveyed. Points inside the rough extent resolve to
    /// the parent county, marked unverified.
    Placeholder {
        /// Rough extent `[west, south, east, north]`.
        bbox: [f64; 4],
    },
}

/// How to query parcel data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParcelFetcherConfig {
    /// `ArcGIS` `FeatureServer` / `MapServer` layer query endpoint.
    Arcgis {
        /// Base query URL (up to `.../query`).
        url: String,
        /// Maximum records per page (default: 1000).
        page_size: Option<u32>,
        /// Extra `where` clause ANDed into every query (default `1=1`).
        where_clause: Option<String>,
    },
    /// Socrata SODA endpoint with a geometry column.
    Socrata {
        /// Resource URL (e.g., `https://data.example.gov/resource/abcd-1234.json`).
        url: String,
        /// Polygon or point column used for spatial filters.
        geometry_column: String,
        /// Records per page (default: 5000).
        limit: Option<u32>,
    },
}

impl ParcelFetcherConfig {
    /// Returns the endpoint URL regardless of variant.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Arcgis { url, .. } | Self::Socrata { url, .. } => url,
        }
    }
}

/// Parcel attribute names in a jurisdiction's schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParcelFieldMapping {
    /// Parcel identifier field (e.g., `"PIN"`).
    pub parcel_id: String,
    /// Zoning code field (e.g., `"ZONING"` or `"ZO_ZONE"`).
    pub zone_code: String,
    /// Zoning district description field.
    #[serde(default)]
    pub zone_description: Option<String>,
    /// Future land use designation field.
    #[serde(default)]
    pub future_land_use: Option<String>,
    /// Parcel area in acres.
    #[serde(default)]
    pub area_acres: Option<String>,
    /// Parcel area in square feet, used when no acreage field exists.
    #[serde(default)]
    pub area_sqft: Option<String>,
    /// Split-zoning indicator field (Y/N, 1/0, true/false).
    #[serde(default)]
    pub split_zoned: Option<String>,
    /// Future-land-use-changed indicator field.
    #[serde(default)]
    pub future_changed: Option<String>,
    /// Latitude field, for sources that publish a label point.
    #[serde(default)]
    pub latitude: Option<String>,
    /// Longitude field, for sources that publish a label point.
    #[serde(default)]
    pub longitude: Option<String>,
}

/// Optional attributes a jurisdiction publishes. Disabled features are
/// never read even if the field mapping names them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct FeatureFlags {
    /// Future land use designations are published.
    #[serde(default)]
    pub future_land_use: bool,
    /// A split-zoning indicator is published.
    #[serde(default)]
    pub split_zoning: bool,
    /// A future-land-use-changed indicator is published.
    #[serde(default)]
    pub future_changed: bool,
    /// Combined codes like `R-1/C-G` denote split zoning.
    #[serde(default)]
    pub split_codes: bool,
}

/// One classification rule. Exactly one of `exact`, `prefix`, or
/// `pattern` must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRuleDef {
    /// Case-insensitive exact code match.
    #[serde(default)]
    pub exact: Option<String>,
    /// Case-insensitive code prefix.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Regular expression matched against the upper-cased code.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Category assigned on match.
    pub category: ZoneCategory,
}
