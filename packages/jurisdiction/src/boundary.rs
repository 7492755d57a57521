//! Town boundary loading.
//!
//! Boundaries come from one of two places, per the town's
//! [`BoundarySource`]: an `ArcGIS` query endpoint fetched once at startup,
//! or a rough placeholder extent for towns whose limits have not been
//! loaded yet. Only fetched boundaries count as surveyed. Counties have no
//! boundary.

use std::collections::BTreeMap;

use geo::{MultiPolygon, Rect, coord};
use geojson::GeoJson;
use zone_map_jurisdiction_models::{BoundarySource, JurisdictionKind};

use crate::{JurisdictionError, JurisdictionRegistry};

/// A loaded town boundary.
#[derive(Debug, Clone)]
pub struct TownBoundary {
    /// Boundary geometry. For placeholders this is the rough extent.
    pub polygon: MultiPolygon<f64>,
    /// Whether the geometry is only a placeholder.
    pub placeholder: bool,
}

impl TownBoundary {
    /// A surveyed boundary.
    #[must_use]
    pub const fn surveyed(polygon: MultiPolygon<f64>) -> Self {
        Self {
            polygon,
            placeholder: false,
        }
    }

    /// A placeholder covering `[west, south, east, north]`.
    #[must_use]
    pub fn placeholder(bbox: [f64; 4]) -> Self {
        Self {
            polygon: bbox_polygon(bbox),
            placeholder: true,
        }
    }
}

/// Loads every town boundary that does not require network access.
///
/// # Errors
///
/// Returns [`JurisdictionError::Config`] if any town uses an `ArcGIS`
/// boundary source.
pub fn load_static(
    registry: &JurisdictionRegistry,
) -> Result<BTreeMap<String, TownBoundary>, JurisdictionError> {
    let mut boundaries = BTreeMap::new();
    for config in registry.of_kind(JurisdictionKind::IncorporatedTown) {
        match &config.source().boundary {
            Some(BoundarySource::Placeholder { bbox }) => {
                boundaries.insert(config.id().to_string(), TownBoundary::placeholder(*bbox));
            }
            Some(BoundarySource::Arcgis { .. }) => {
                return Err(JurisdictionError::Config {
                    message: format!(
                        "town '{}' needs a network boundary fetch; use boundary::load_all",
                        config.id()
                    ),
                });
            }
            None => {}
        }
    }
    Ok(boundaries)
}

/// Loads every town boundary, fetching remote ones.
///
/// A remote boundary that cannot be fetched is fatal: without it points in
/// that town would silently resolve to the county.
///
/// # Errors
///
/// Returns [`JurisdictionError`] if any boundary fails to load.
pub async fn load_all(
    client: &reqwest::Client,
    registry: &JurisdictionRegistry,
) -> Result<BTreeMap<String, TownBoundary>, JurisdictionError> {
    let mut boundaries = BTreeMap::new();
    for config in registry.of_kind(JurisdictionKind::IncorporatedTown) {
        let boundary = match &config.source().boundary {
            Some(BoundarySource::Arcgis { url, where_clause }) => {
                let features =
                    fetch_arcgis(client, config.id(), url, where_clause.as_deref()).await?;
                let polygon = features_to_multipolygon(&features).ok_or_else(|| {
                    JurisdictionError::Boundary {
                        jurisdiction: config.id().to_string(),
                        message: "ArcGIS response contained no polygon features".to_string(),
                    }
                })?;
                TownBoundary::surveyed(polygon)
            }
            Some(BoundarySource::Placeholder { bbox }) => TownBoundary::placeholder(*bbox),
            None => continue,
        };
        log::info!(
            "Loaded boundary for {} ({})",
            config.id(),
            if boundary.placeholder {
                "placeholder"
            } else {
                "surveyed"
            }
        );
        boundaries.insert(config.id().to_string(), boundary);
    }
    Ok(boundaries)
}

/// Fetches all boundary features from an `ArcGIS` query endpoint as
/// `GeoJSON`, following `exceededTransferLimit` pagination.
///
/// Network failures, 5xx and 429 are [`JurisdictionError::DataSourceUnavailable`];
/// other failed statuses and unreadable bodies are
/// [`JurisdictionError::Boundary`].
async fn fetch_arcgis(
    client: &reqwest::Client,
    jurisdiction: &str,
    base_url: &str,
    where_clause: Option<&str>,
) -> Result<Vec<serde_json::Value>, JurisdictionError> {
    let unavailable = |message: String| JurisdictionError::DataSourceUnavailable {
        jurisdiction: jurisdiction.to_string(),
        message,
    };
    let invalid = |message: String| JurisdictionError::Boundary {
        jurisdiction: jurisdiction.to_string(),
        message,
    };

    let where_clause = where_clause.unwrap_or("1=1");
    let mut all_features = Vec::new();
    let mut offset = 0usize;

    loop {
        let offset_str = offset.to_string();
        let resp = client
            .get(base_url)
            .query(&[
                ("where", where_clause),
                ("outFields", "*"),
                ("f", "geojson"),
                ("outSR", "4326"),
                ("returnGeometry", "true"),
                ("resultOffset", offset_str.as_str()),
            ])
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let status = resp.status();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(unavailable(format!("ArcGIS request failed with status {status}")));
        }
        if !status.is_success() {
            return Err(invalid(format!("ArcGIS request failed with status {status}")));
        }
        let body = resp.text().await.map_err(|e| unavailable(e.to_string()))?;

        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| invalid(format!("Failed to parse ArcGIS response: {e}")))?;

        if json.get("error").is_some() {
            return Err(unavailable(format!(
                "ArcGIS API error: {}",
                json["error"]["message"].as_str().unwrap_or("unknown error")
            )));
        }

        let features = json["features"]
            .as_array()
            .ok_or_else(|| invalid("No features array in ArcGIS response".to_string()))?;

        if features.is_empty() {
            break;
        }

        all_features.extend(features.iter().cloned());

        let exceeded = json["exceededTransferLimit"].as_bool().unwrap_or(false)
            || json["properties"]["exceededTransferLimit"]
                .as_bool()
                .unwrap_or(false);
        if !exceeded {
            break;
        }
        offset += features.len();
    }

    log::debug!(
        "{jurisdiction}: fetched {} boundary features",
        all_features.len()
    );
    Ok(all_features)
}

/// Merges the polygon geometries of raw `GeoJSON` feature values.
/// Non-polygon geometries are ignored.
#[must_use]
pub fn features_to_multipolygon(features: &[serde_json::Value]) -> Option<MultiPolygon<f64>> {
    let polygons: Vec<_> = features
        .iter()
        .filter_map(|f| GeoJson::from_json_value(f.clone()).ok())
        .filter_map(geojson_to_multipolygon)
        .flat_map(|mp| mp.0)
        .collect();
    if polygons.is_empty() {
        None
    } else {
        Some(MultiPolygon(polygons))
    }
}

fn geojson_to_multipolygon(geojson: GeoJson) -> Option<MultiPolygon<f64>> {
    let geometries = match geojson {
        GeoJson::Geometry(geom) => vec![geom],
        GeoJson::Feature(feature) => feature.geometry.into_iter().collect(),
        GeoJson::FeatureCollection(fc) => fc
            .features
            .into_iter()
            .filter_map(|f| f.geometry)
            .collect(),
    };

    let polygons: Vec<_> = geometries
        .into_iter()
        .filter_map(|geom| geo::Geometry::<f64>::try_from(geom).ok())
        .flat_map(|geom| match geom {
            geo::Geometry::MultiPolygon(mp) => mp.0,
            geo::Geometry::Polygon(p) => vec![p],
            _ => vec![],
        })
        .collect();

    if polygons.is_empty() {
        None
    } else {
        Some(MultiPolygon(polygons))
    }
}

/// Converts `[west, south, east, north]` into a rectangular polygon.
#[must_use]
pub fn bbox_polygon([west, south, east, north]: [f64; 4]) -> MultiPolygon<f64> {
    let rect = Rect::new(coord! { x: west, y: south }, coord! { x: east, y: north });
    MultiPolygon(vec![rect.to_polygon()])
}

#[cfg(test)]
mod tests {
    use geo::{Contains, Point};
    use zone_map_jurisdiction_models::JurisdictionSource;

    use super::*;
    use crate::registry::global;
    use crate::test_server::StubServer;

    fn square_feature(west: f64, south: f64, size: f64) -> serde_json::Value {
        let (east, north) = (west + size, south + size);
        serde_json::json!({
            "type": "Feature",
            "properties": { "TOWN": "Carrboro" },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[
                    [west, south], [east, south], [east, north], [west, north], [west, south]
                ]]
            }
        })
    }

    /// The county plus Carrboro, with Carrboro's limits served from `url`.
    fn registry_with_remote_carrboro(url: &str) -> JurisdictionRegistry {
        let county = global().get("orange_county_nc").unwrap().source().clone();
        let mut carrboro: JurisdictionSource = global().get("carrboro").unwrap().source().clone();
        carrboro.boundary = Some(BoundarySource::Arcgis {
            url: url.to_string(),
            where_clause: Some("TOWN='Carrboro'".to_string()),
        });
        JurisdictionRegistry::from_sources(vec![county, carrboro]).unwrap()
    }

    #[test]
    fn embedded_towns_are_all_placeholders() {
        let boundaries = load_static(global()).unwrap();
        assert_eq!(boundaries.len(), 3);
        assert!(boundaries.values().all(|b| b.placeholder));
    }

    #[test]
    fn parses_arcgis_geojson_features() {
        let features = vec![
            square_feature(0.0, 0.0, 1.0),
            serde_json::json!({
                "type": "Feature",
                "properties": { "NAME": "Line" },
                "geometry": { "type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]] }
            }),
        ];
        let mp = features_to_multipolygon(&features).unwrap();
        assert_eq!(mp.0.len(), 1);
        assert!(mp.contains(&Point::new(0.5, 0.5)));
    }

    #[test]
    fn placeholder_covers_its_bbox() {
        let boundary = TownBoundary::placeholder([-79.13, 36.04, -79.07, 36.10]);
        assert!(boundary.placeholder);
        assert!(boundary.polygon.contains(&Point::new(-79.10, 36.07)));
        assert!(!boundary.polygon.contains(&Point::new(-79.00, 36.07)));
    }

    #[test]
    fn static_load_refuses_remote_boundaries() {
        let registry = registry_with_remote_carrboro("http://127.0.0.1:9/query");
        let err = load_static(&registry).unwrap_err();
        assert!(matches!(err, JurisdictionError::Config { .. }));
        assert!(err.to_string().contains("carrboro"));
    }

    #[tokio::test]
    async fn remote_boundary_is_fetched_across_pages() {
        let first = serde_json::json!({
            "type": "FeatureCollection",
            "features": [square_feature(-79.12, 35.90, 0.01)],
            "properties": { "exceededTransferLimit": true }
        });
        let second = serde_json::json!({
            "type": "FeatureCollection",
            "features": [square_feature(-79.10, 35.92, 0.01)]
        });
        let server =
            StubServer::start(vec![(200, first.to_string()), (200, second.to_string())]).await;
        let registry = registry_with_remote_carrboro(&server.url);

        let boundaries = load_all(&reqwest::Client::new(), &registry).await.unwrap();

        let carrboro = &boundaries["carrboro"];
        assert!(!carrboro.placeholder);
        assert_eq!(carrboro.polygon.0.len(), 2);
        assert!(carrboro.polygon.contains(&Point::new(-79.095, 35.925)));

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].contains("f=geojson"));
        assert!(requests[1].contains("resultOffset=1"));
    }

    #[tokio::test]
    async fn remote_boundary_failures_are_fatal() {
        let server = StubServer::start(vec![(503, "{}".to_string())]).await;
        let registry = registry_with_remote_carrboro(&server.url);
        let err = load_all(&reqwest::Client::new(), &registry)
            .await
            .unwrap_err();
        assert!(matches!(err, JurisdictionError::DataSourceUnavailable { .. }));

        let server = StubServer::start(vec![(400, "{}".to_string())]).await;
        let registry = registry_with_remote_carrboro(&server.url);
        let err = load_all(&reqwest::Client::new(), &registry)
            .await
            .unwrap_err();
        assert!(matches!(err, JurisdictionError::Boundary { .. }));

        let empty = serde_json::json!({ "type": "FeatureCollection", "features": [] });
        let server = StubServer::start(vec![(200, empty.to_string())]).await;
        let registry = registry_with_remote_carrboro(&server.url);
        let err = load_all(&reqwest::Client::new(), &registry)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no polygon features"));
    }
}
