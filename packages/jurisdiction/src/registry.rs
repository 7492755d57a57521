//! Compile-time registry of jurisdiction definitions.
//!
//! Each entry is a `(name, toml_content)` pair embedded via `include_str!`.
//! Adding a new jurisdiction requires creating a TOML file in
//! `jurisdictions/` and adding a corresponding entry here.
//!
//! The compiled [`JurisdictionRegistry`] is immutable. It is built once per
//! process ([`global`]) and read concurrently without locking.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, LazyLock};

use zone_map_jurisdiction_models::{JurisdictionKind, JurisdictionSource};

use crate::{JurisdictionConfig, JurisdictionError};

/// Number of registered jurisdictions. Updated when new jurisdictions are
/// added. Enforced by a test.
#[cfg(test)]
const EXPECTED_JURISDICTION_COUNT: usize = 4;

/// Embedded TOML jurisdiction definitions.
const JURISDICTION_TOMLS: &[(&str, &str)] = &[
    (
        "orange_county_nc",
        include_str!("../jurisdictions/orange_county_nc.toml"),
    ),
    ("chapel_hill", include_str!("../jurisdictions/chapel_hill.toml")),
    ("carrboro", include_str!("../jurisdictions/carrboro.toml")),
    ("hillsborough", include_str!("../jurisdictions/hillsborough.toml")),
];

/// Returns all embedded jurisdiction definitions.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. Since these are
/// compile-time constants, parse failures indicate a development error
/// and are caught during CI.
#[must_use]
pub fn all_sources() -> Vec<JurisdictionSource> {
    JURISDICTION_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse jurisdiction '{name}': {e}"))
        })
        .collect()
}

static GLOBAL: LazyLock<JurisdictionRegistry> = LazyLock::new(|| {
    JurisdictionRegistry::from_sources(all_sources())
        .unwrap_or_else(|e| panic!("Invalid embedded jurisdiction registry: {e}"))
});

/// Returns the process-wide registry built from the embedded definitions.
///
/// # Panics
///
/// Panics on first access if the embedded definitions are inconsistent
/// (same development-error class as [`all_sources`]).
#[must_use]
pub fn global() -> &'static JurisdictionRegistry {
    &GLOBAL
}

/// Immutable map from jurisdiction id to compiled configuration.
#[derive(Debug, Default)]
pub struct JurisdictionRegistry {
    configs: HashMap<String, Arc<JurisdictionConfig>>,
}

impl JurisdictionRegistry {
    /// Validates and compiles a set of jurisdiction definitions.
    ///
    /// Checks that ids are unique, counties declare a coverage region,
    /// towns declare a boundary and an existing county parent, and every
    /// classification rule compiles.
    ///
    /// # Errors
    ///
    /// Returns [`JurisdictionError`] describing the first inconsistency.
    pub fn from_sources(sources: Vec<JurisdictionSource>) -> Result<Self, JurisdictionError> {
        let county_ids: BTreeSet<String> = sources
            .iter()
            .filter(|s| s.kind == JurisdictionKind::County)
            .map(|s| s.id.clone())
            .collect();

        let mut configs = HashMap::with_capacity(sources.len());

        for source in sources {
            validate(&source, &county_ids)?;
            let id = source.id.clone();
            let config = JurisdictionConfig::compile(source)?;
            if configs.insert(id.clone(), Arc::new(config)).is_some() {
                return Err(JurisdictionError::Config {
                    message: format!("duplicate jurisdiction id '{id}'"),
                });
            }
        }

        log::info!(
            "Loaded {} jurisdictions ({} counties)",
            configs.len(),
            county_ids.len()
        );

        Ok(Self { configs })
    }

    /// Looks up a jurisdiction's configuration.
    ///
    /// # Errors
    ///
    /// Returns [`JurisdictionError::UnsupportedJurisdiction`] for unknown ids.
    pub fn get(&self, id: &str) -> Result<&Arc<JurisdictionConfig>, JurisdictionError> {
        self.configs
            .get(id)
            .ok_or_else(|| JurisdictionError::UnsupportedJurisdiction { id: id.to_string() })
    }

    /// Number of configured jurisdictions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    /// Returns `true` if no jurisdictions are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// All configurations, sorted by id.
    #[must_use]
    pub fn all(&self) -> Vec<&Arc<JurisdictionConfig>> {
        let mut all: Vec<_> = self.configs.values().collect();
        all.sort_by(|a, b| a.id().cmp(b.id()));
        all
    }

    /// Configurations of a given kind, sorted by id.
    #[must_use]
    pub fn of_kind(&self, kind: JurisdictionKind) -> Vec<&Arc<JurisdictionConfig>> {
        self.all()
            .into_iter()
            .filter(|c| c.kind() == kind)
            .collect()
    }
}

fn validate(
    source: &JurisdictionSource,
    county_ids: &BTreeSet<String>,
) -> Result<(), JurisdictionError> {
    let config_error = |message: String| JurisdictionError::Config { message };

    if source.id.is_empty() {
        return Err(config_error("jurisdiction with empty id".to_string()));
    }

    match source.kind {
        JurisdictionKind::County => {
            let Some([west, south, east, north]) = source.coverage_bbox else {
                return Err(config_error(format!(
                    "county '{}' has no coverage_bbox",
                    source.id
                )));
            };
            if west >= east || south >= north {
                return Err(config_error(format!(
                    "county '{}' has an empty coverage_bbox",
                    source.id
                )));
            }
        }
        JurisdictionKind::IncorporatedTown => {
            if source.boundary.is_none() {
                return Err(config_error(format!(
                    "town '{}' has no boundary",
                    source.id
                )));
            }
            match &source.parent {
                Some(parent) if county_ids.contains(parent) => {}
                Some(parent) => {
                    return Err(config_error(format!(
                        "town '{}' names unknown parent county '{parent}'",
                        source.id
                    )));
                }
                None => {
                    return Err(config_error(format!(
                        "town '{}' has no parent county",
                        source.id
                    )));
                }
            }
        }
    }

    Ok(())
}
