#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Jurisdiction registry and resolution.
//!
//! A county and the towns incorporated within it each publish parcel data
//! through their own endpoints, with their own field names and zoning
//! vocabularies. Jurisdictions are defined as TOML files embedded at
//! compile time (see [`registry`]) and compiled once into an immutable
//! [`JurisdictionRegistry`]. The [`resolver`] decides which jurisdiction
//! governs a point using town boundary polygons loaded by [`boundary`].

pub mod boundary;
pub mod registry;
pub mod resolver;

#[cfg(test)]
mod test_server;

use std::sync::Arc;

use geo::MultiPolygon;
use thiserror::Error;
use zone_map_classifier::{ClassifierError, ZoneVocabulary};
use zone_map_jurisdiction_models::{
    FeatureFlags, JurisdictionKind, JurisdictionSource, ParcelFetcherConfig, ParcelFieldMapping,
};

pub use registry::JurisdictionRegistry;
pub use resolver::{JurisdictionResolver, Resolution};

/// Errors that can occur while loading or resolving jurisdictions.
#[derive(Debug, Error)]
pub enum JurisdictionError {
    /// No jurisdiction with this id is configured.
    #[error("Unsupported jurisdiction: '{id}' is not configured")]
    UnsupportedJurisdiction {
        /// The requested jurisdiction id.
        id: String,
    },

    /// The point lies outside every supported region.
    #[error(
        "Unsupported jurisdiction: point ({longitude}, {latitude}) lies outside every supported region"
    )]
    UnsupportedLocation {
        /// Longitude of the rejected point.
        longitude: f64,
        /// Latitude of the rejected point.
        latitude: f64,
    },

    /// A boundary data source could not be reached.
    #[error("Boundary data source unavailable for '{jurisdiction}': {message}")]
    DataSourceUnavailable {
        /// Jurisdiction whose boundary failed to load.
        jurisdiction: String,
        /// Description of the failure.
        message: String,
    },

    /// Boundary geometry could not be parsed.
    #[error("Boundary error for '{jurisdiction}': {message}")]
    Boundary {
        /// Jurisdiction whose boundary is invalid.
        jurisdiction: String,
        /// Description of what went wrong.
        message: String,
    },

    /// A jurisdiction definition is inconsistent.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// A classification rule failed to compile.
    #[error("Classification rules for '{jurisdiction}': {source}")]
    Classifier {
        /// Jurisdiction whose rules are invalid.
        jurisdiction: String,
        /// Underlying compile error.
        source: ClassifierError,
    },
}

impl JurisdictionError {
    /// Returns `true` for both unsupported-id and out-of-region errors.
    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedJurisdiction { .. } | Self::UnsupportedLocation { .. }
        )
    }
}

/// A governing jurisdiction.
///
/// `boundary` is `None` for the county fallback, which governs every point
/// in its region not claimed by a town.
#[derive(Debug, Clone)]
pub struct Jurisdiction {
    /// Registry id.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// County or incorporated town.
    pub kind: JurisdictionKind,
    /// Parent county id for towns.
    pub parent: Option<String>,
    /// Surveyed boundary polygon, if any.
    pub boundary: Option<Arc<MultiPolygon<f64>>>,
}

/// A jurisdiction's compiled configuration: endpoint, field mapping,
/// feature flags, and zoning vocabulary.
#[derive(Debug)]
pub struct JurisdictionConfig {
    source: JurisdictionSource,
    vocabulary: ZoneVocabulary,
}

impl JurisdictionConfig {
    /// Compiles a jurisdiction definition.
    ///
    /// # Errors
    ///
    /// Returns [`JurisdictionError::Classifier`] if a rule fails to compile.
    pub fn compile(source: JurisdictionSource) -> Result<Self, JurisdictionError> {
        let vocabulary =
            ZoneVocabulary::from_source(&source).map_err(|e| JurisdictionError::Classifier {
                jurisdiction: source.id.clone(),
                source: e,
            })?;
        Ok(Self { source, vocabulary })
    }

    /// Registry id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.source.id
    }

    /// Human-readable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.source.name
    }

    /// County or incorporated town.
    #[must_use]
    pub const fn kind(&self) -> JurisdictionKind {
        self.source.kind
    }

    /// The underlying definition.
    #[must_use]
    pub const fn source(&self) -> &JurisdictionSource {
        &self.source
    }

    /// Parcel endpoint configuration.
    #[must_use]
    pub const fn fetcher(&self) -> &ParcelFetcherConfig {
        &self.source.fetcher
    }

    /// Parcel field names.
    #[must_use]
    pub const fn fields(&self) -> &ParcelFieldMapping {
        &self.source.fields
    }

    /// Optional attributes this jurisdiction publishes.
    #[must_use]
    pub const fn features(&self) -> &FeatureFlags {
        &self.source.features
    }

    /// Compiled zoning vocabulary.
    #[must_use]
    pub const fn vocabulary(&self) -> &ZoneVocabulary {
        &self.vocabulary
    }
}
