//! Point-in-boundary jurisdiction resolution.
//!
//! Town boundaries are held in an R-tree for fast candidate lookup, then
//! tested exactly. Containment is closed: a point on a boundary edge
//! belongs to the town. Towns are checked before the county fallback, and
//! when town boundaries overlap the smallest one wins.

use std::collections::BTreeMap;
use std::sync::Arc;

use geo::{Area, BoundingRect, Intersects, MultiPolygon, Point};
use rstar::{AABB, RTree, RTreeObject};
use zone_map_jurisdiction_models::JurisdictionKind;
use zone_map_zoning_models::GeoPoint;

use crate::boundary::{self, TownBoundary};
use crate::{Jurisdiction, JurisdictionConfig, JurisdictionError, JurisdictionRegistry};

/// A town boundary stored in the R-tree with its metadata.
struct TownEntry {
    jurisdiction: Jurisdiction,
    parent: String,
    placeholder: bool,
    area: f64,
    envelope: AABB<[f64; 2]>,
    polygon: Arc<MultiPolygon<f64>>,
}

impl RTreeObject for TownEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

struct CountyEntry {
    jurisdiction: Jurisdiction,
    coverage: MultiPolygon<f64>,
    area: f64,
}

/// The jurisdiction governing a point.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The governing jurisdiction.
    pub jurisdiction: Jurisdiction,
    /// Set when the point lies inside a town whose boundary is only a
    /// placeholder; `jurisdiction` is then the parent county and may be
    /// wrong for this point.
    pub unverified: bool,
    /// The placeholder town the point fell inside, if any.
    pub placeholder_town: Option<String>,
}

/// Resolves points to jurisdictions. Immutable once built.
pub struct JurisdictionResolver {
    towns: RTree<TownEntry>,
    counties: Vec<CountyEntry>,
}

impl JurisdictionResolver {
    /// Builds a resolver from a registry and loaded town boundaries.
    ///
    /// # Errors
    ///
    /// Returns [`JurisdictionError::Config`] if a town in the registry has
    /// no loaded boundary or a county has no coverage region.
    pub fn new(
        registry: &JurisdictionRegistry,
        mut boundaries: BTreeMap<String, TownBoundary>,
    ) -> Result<Self, JurisdictionError> {
        let mut towns = Vec::new();
        for config in registry.of_kind(JurisdictionKind::IncorporatedTown) {
            let boundary =
                boundaries
                    .remove(config.id())
                    .ok_or_else(|| JurisdictionError::Config {
                        message: format!("no boundary loaded for town '{}'", config.id()),
                    })?;
            towns.push(town_entry(config, boundary)?);
        }

        let mut counties = registry
            .of_kind(JurisdictionKind::County)
            .into_iter()
            .map(|config| county_entry(config))
            .collect::<Result<Vec<_>, _>>()?;
        counties.sort_by(|a, b| {
            a.area
                .total_cmp(&b.area)
                .then_with(|| a.jurisdiction.id.cmp(&b.jurisdiction.id))
        });

        log::info!(
            "Built jurisdiction resolver: {} towns, {} counties",
            towns.len(),
            counties.len()
        );

        Ok(Self {
            towns: RTree::bulk_load(towns),
            counties,
        })
    }

    /// Builds a resolver using only placeholder boundaries.
    ///
    /// # Errors
    ///
    /// Returns [`JurisdictionError`] if a boundary fails to load or needs a
    /// network fetch.
    pub fn from_static(registry: &JurisdictionRegistry) -> Result<Self, JurisdictionError> {
        Self::new(registry, boundary::load_static(registry)?)
    }

    /// Builds a resolver, fetching remote town boundaries once.
    ///
    /// # Errors
    ///
    /// Returns [`JurisdictionError`] if any boundary fails to load.
    pub async fn load(
        client: &reqwest::Client,
        registry: &JurisdictionRegistry,
    ) -> Result<Self, JurisdictionError> {
        let boundaries = boundary::load_all(client, registry).await?;
        Self::new(registry, boundaries)
    }

    /// Determines which jurisdiction governs a point.
    ///
    /// # Errors
    ///
    /// Returns [`JurisdictionError::UnsupportedLocation`] if the point is
    /// invalid or lies outside every county's coverage region.
    pub fn resolve(&self, point: GeoPoint) -> Result<Resolution, JurisdictionError> {
        let unsupported = || JurisdictionError::UnsupportedLocation {
            longitude: point.longitude,
            latitude: point.latitude,
        };
        if !point.is_valid() {
            return Err(unsupported());
        }

        let geo_point = Point::new(point.longitude, point.latitude);
        let query_env = AABB::from_point([point.longitude, point.latitude]);

        // Surveyed beats placeholder, then smallest area, then id.
        let best = self
            .towns
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.intersects(&geo_point))
            .min_by(|a, b| {
                a.placeholder
                    .cmp(&b.placeholder)
                    .then_with(|| a.area.total_cmp(&b.area))
                    .then_with(|| a.jurisdiction.id.cmp(&b.jurisdiction.id))
            });

        match best {
            Some(town) if !town.placeholder => {
                log::debug!(
                    "Resolved ({}, {}) to town {}",
                    point.longitude,
                    point.latitude,
                    town.jurisdiction.id
                );
                Ok(Resolution {
                    jurisdiction: town.jurisdiction.clone(),
                    unverified: false,
                    placeholder_town: None,
                })
            }
            Some(town) => {
                let county = self
                    .counties
                    .iter()
                    .find(|c| c.jurisdiction.id == town.parent)
                    .ok_or_else(unsupported)?;
                log::warn!(
                    "Point ({}, {}) is inside {} whose boundary is a placeholder; \
                     using {} (unverified)",
                    point.longitude,
                    point.latitude,
                    town.jurisdiction.id,
                    county.jurisdiction.id
                );
                Ok(Resolution {
                    jurisdiction: county.jurisdiction.clone(),
                    unverified: true,
                    placeholder_town: Some(town.jurisdiction.id.clone()),
                })
            }
            None => {
                let county = self
                    .counties
                    .iter()
                    .find(|c| c.coverage.intersects(&geo_point))
                    .ok_or_else(unsupported)?;
                Ok(Resolution {
                    jurisdiction: county.jurisdiction.clone(),
                    unverified: false,
                    placeholder_town: None,
                })
            }
        }
    }
}

fn town_entry(
    config: &JurisdictionConfig,
    boundary: TownBoundary,
) -> Result<TownEntry, JurisdictionError> {
    let parent = config
        .source()
        .parent
        .clone()
        .ok_or_else(|| JurisdictionError::Config {
            message: format!("town '{}' has no parent county", config.id()),
        })?;
    let rect = boundary
        .polygon
        .bounding_rect()
        .ok_or_else(|| JurisdictionError::Boundary {
            jurisdiction: config.id().to_string(),
            message: "boundary has no extent".to_string(),
        })?;
    let envelope = AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);
    let area = boundary.polygon.unsigned_area();
    let polygon = Arc::new(boundary.polygon);

    Ok(TownEntry {
        jurisdiction: Jurisdiction {
            id: config.id().to_string(),
            name: config.name().to_string(),
            kind: config.kind(),
            parent: Some(parent.clone()),
            boundary: (!boundary.placeholder).then(|| Arc::clone(&polygon)),
        },
        parent,
        placeholder: boundary.placeholder,
        area,
        envelope,
        polygon,
    })
}

fn county_entry(config: &JurisdictionConfig) -> Result<CountyEntry, JurisdictionError> {
    let bbox = config
        .source()
        .coverage_bbox
        .ok_or_else(|| JurisdictionError::Config {
            message: format!("county '{}' has no coverage_bbox", config.id()),
        })?;
    let coverage = boundary::bbox_polygon(bbox);
    Ok(CountyEntry {
        jurisdiction: Jurisdiction {
            id: config.id().to_string(),
            name: config.name().to_string(),
            kind: config.kind(),
            parent: None,
            boundary: None,
        },
        area: coverage.unsigned_area(),
        coverage,
    })
}
