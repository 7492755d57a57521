//! `ArcGIS` `FeatureServer` / `MapServer` parcel fetcher.
//!
//! Point lookups use `geometryType=esriGeometryPoint` with
//! `spatialRel=esriSpatialRelIntersects`. Radius lookups add
//! `distance`/`units=esriSRUnit_Meter`, which buffers the point server-side,
//! and paginate via `resultOffset` while the server reports
//! `exceededTransferLimit`.

use std::time::Duration;

use geo::{Centroid, LineString, MultiPolygon, Polygon, Winding};
use zone_map_jurisdiction::JurisdictionConfig;
use zone_map_zoning_models::GeoPoint;

use super::{RawParcel, send_json};
use crate::ParcelError;
use crate::normalize::requested_fields;

/// Records per page when the jurisdiction does not set `page_size`.
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// A radius query against one `ArcGIS` layer.
#[derive(Debug, Clone, Copy)]
pub struct RadiusQuery<'a> {
    /// Layer query URL (up to `.../query`).
    pub url: &'a str,
    /// Extra `where` clause, `1=1` when absent.
    pub where_clause: Option<&'a str>,
    /// Records per page.
    pub page_size: u32,
    /// Query center.
    pub point: GeoPoint,
    /// Buffer distance in meters.
    pub radius_meters: f64,
}

/// One parsed page of an `ArcGIS` query response.
#[derive(Debug, Default)]
pub struct ArcgisPage {
    /// Parcels on this page.
    pub parcels: Vec<RawParcel>,
    /// Whether the server truncated the result set.
    pub exceeded_transfer_limit: bool,
}

/// Fetches the parcels intersecting a point.
///
/// # Errors
///
/// Returns [`ParcelError`] if the request fails or the response cannot be
/// parsed.
pub async fn fetch_at_point(
    client: &reqwest::Client,
    config: &JurisdictionConfig,
    url: &str,
    where_clause: Option<&str>,
    point: GeoPoint,
    request_timeout: Duration,
) -> Result<Vec<RawParcel>, ParcelError> {
    let geometry = format!("{},{}", point.longitude, point.latitude);
    let out_fields = requested_fields(config).join(",");

    let request = client.get(url).query(&[
        ("where", where_clause.unwrap_or("1=1")),
        ("geometry", geometry.as_str()),
        ("geometryType", "esriGeometryPoint"),
        ("inSR", "4326"),
        ("spatialRel", "esriSpatialRelIntersects"),
        ("outFields", out_fields.as_str()),
        ("returnGeometry", "true"),
        ("outSR", "4326"),
        ("f", "json"),
    ]);

    let json = send_json(request, config.id(), request_timeout).await?;
    Ok(parse_page(&json, config.id())?.parcels)
}

/// Fetches every parcel within the query radius.
///
/// # Errors
///
/// Returns [`ParcelError`] if any page request fails or cannot be parsed.
pub async fn fetch_within(
    client: &reqwest::Client,
    config: &JurisdictionConfig,
    query: &RadiusQuery<'_>,
    request_timeout: Duration,
) -> Result<Vec<RawParcel>, ParcelError> {
    let geometry = format!("{},{}", query.point.longitude, query.point.latitude);
    let distance = query.radius_meters.to_string();
    let out_fields = requested_fields(config).join(",");
    let page_size = query.page_size.to_string();
    let order_by = config.fields().parcel_id.as_str();

    let mut all_parcels = Vec::new();
    let mut offset = 0usize;

    loop {
        let offset_str = offset.to_string();
        let request = client.get(query.url).query(&[
            ("where", query.where_clause.unwrap_or("1=1")),
            ("geometry", geometry.as_str()),
            ("geometryType", "esriGeometryPoint"),
            ("inSR", "4326"),
            ("spatialRel", "esriSpatialRelIntersects"),
            ("distance", distance.as_str()),
            ("units", "esriSRUnit_Meter"),
            ("outFields", out_fields.as_str()),
            ("returnGeometry", "true"),
            ("outSR", "4326"),
            ("orderByFields", order_by),
            ("resultOffset", offset_str.as_str()),
            ("resultRecordCount", page_size.as_str()),
            ("f", "json"),
        ]);

        let json = send_json(request, config.id(), request_timeout).await?;
        let page = parse_page(&json, config.id())?;
        let count = page.parcels.len();
        log::debug!("{}: offset={offset}, page={count}", config.id());

        if count == 0 {
            break;
        }
        all_parcels.extend(page.parcels);

        if !page.exceeded_transfer_limit {
            break;
        }
        offset += count;
    }

    Ok(all_parcels)
}

/// Parses an `ArcGIS` `f=json` query response.
///
/// # Errors
///
/// Returns [`ParcelError::DataSourceUnavailable`] for server-side API
/// errors (code >= 500) and [`ParcelError::InvalidResponse`] for other API
/// errors or a missing `features` array.
pub fn parse_page(json: &serde_json::Value, jurisdiction: &str) -> Result<ArcgisPage, ParcelError> {
    if let Some(error) = json.get("error") {
        let code = error["code"].as_i64().unwrap_or(0);
        let message = format!(
            "ArcGIS API error {code}: {}",
            error["message"].as_str().unwrap_or("unknown error")
        );
        return Err(if code >= 500 {
            ParcelError::DataSourceUnavailable {
                jurisdiction: jurisdiction.to_string(),
                message,
            }
        } else {
            ParcelError::InvalidResponse {
                jurisdiction: jurisdiction.to_string(),
                message,
            }
        });
    }

    let features = json["features"]
        .as_array()
        .ok_or_else(|| ParcelError::InvalidResponse {
            jurisdiction: jurisdiction.to_string(),
            message: "No features array in ArcGIS response".to_string(),
        })?;

    // ArcGIS wraps attributes in { "attributes": {...}, "geometry": {...} }
    let parcels = features
        .iter()
        .filter_map(|feature| {
            let attributes = feature.get("attributes")?.as_object()?.clone();
            let centroid = feature.get("geometry").and_then(esri_centroid);
            Some(RawParcel {
                attributes,
                centroid,
            })
        })
        .collect();

    Ok(ArcgisPage {
        parcels,
        exceeded_transfer_limit: json["exceededTransferLimit"].as_bool().unwrap_or(false),
    })
}

/// Computes the centroid of an Esri JSON geometry (`{ "x", "y" }` or
/// `{ "rings": [...] }`).
///
/// Esri polygons list exterior rings clockwise and holes counter-clockwise;
/// only exterior rings contribute.
fn esri_centroid(geometry: &serde_json::Value) -> Option<GeoPoint> {
    if let (Some(x), Some(y)) = (geometry["x"].as_f64(), geometry["y"].as_f64()) {
        return Some(GeoPoint::new(x, y));
    }

    let rings: Vec<LineString<f64>> = geometry
        .get("rings")?
        .as_array()?
        .iter()
        .filter_map(|ring| {
            let coords: Vec<(f64, f64)> = ring
                .as_array()?
                .iter()
                .filter_map(|pt| Some((pt.get(0)?.as_f64()?, pt.get(1)?.as_f64()?)))
                .collect();
            (coords.len() >= 3).then(|| LineString::from(coords))
        })
        .collect();

    let exteriors: Vec<_> = rings.iter().filter(|r| r.is_cw()).cloned().collect();
    let exteriors = if exteriors.is_empty() { rings } else { exteriors };

    let polygons = MultiPolygon(
        exteriors
            .into_iter()
            .map(|ring| Polygon::new(ring, vec![]))
            .collect(),
    );
    let centroid = polygons.centroid()?;
    Some(GeoPoint::new(centroid.x(), centroid.y()))
}
