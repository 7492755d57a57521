//! Socrata SODA parcel fetcher.
//!
//! Queries a resource `.json` endpoint with `SoQL` spatial functions on the
//! jurisdiction's geometry column: `intersects(...)` for the parcel under a
//! point and `within_circle(...)` for a radius. Results are paged with
//! `$limit`/`$offset`, ordered by the parcel id so pages are stable.

use std::time::Duration;

use geo::Centroid;
use zone_map_jurisdiction::JurisdictionConfig;
use zone_map_zoning_models::GeoPoint;

use super::{RawParcel, send_json};
use crate::ParcelError;

/// Records per page when the jurisdiction does not set `limit`.
pub const DEFAULT_LIMIT: u32 = 5000;

/// A radius query against one Socrata resource.
#[derive(Debug, Clone, Copy)]
pub struct RadiusQuery<'a> {
    /// Resource URL.
    pub url: &'a str,
    /// Column the spatial filter applies to.
    pub geometry_column: &'a str,
    /// Records per page.
    pub limit: u32,
    /// Query center.
    pub point: GeoPoint,
    /// Circle radius in meters.
    pub radius_meters: f64,
}

/// Fetches the parcels whose geometry intersects a point.
///
/// # Errors
///
/// Returns [`ParcelError`] if the request fails or the response cannot be
/// parsed.
pub async fn fetch_at_point(
    client: &reqwest::Client,
    config: &JurisdictionConfig,
    url: &str,
    geometry_column: &str,
    point: GeoPoint,
    request_timeout: Duration,
) -> Result<Vec<RawParcel>, ParcelError> {
    let filter = format!(
        "intersects({geometry_column}, 'POINT ({} {})')",
        point.longitude, point.latitude
    );

    let request = client
        .get(url)
        .query(&[("$where", filter.as_str()), ("$limit", "1")]);

    let json = send_json(request, config.id(), request_timeout).await?;
    parse_rows(&json, geometry_column, config.id())
}

/// Fetches every parcel within the query circle, across all pages.
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
    // within_circle takes latitude before longitude
    let filter = format!(
        "within_circle({}, {}, {}, {})",
        query.geometry_column, query.point.latitude, query.point.longitude, query.radius_meters
    );
    let limit = query.limit.to_string();
    let order = config.fields().parcel_id.as_str();

    let mut all_parcels = Vec::new();
    let mut offset = 0usize;

    loop {
        let offset_str = offset.to_string();
        let request = client.get(query.url).query(&[
            ("$where", filter.as_str()),
            ("$order", order),
            ("$limit", limit.as_str()),
            ("$offset", offset_str.as_str()),
        ]);

        let json = send_json(request, config.id(), request_timeout).await?;
        let page = parse_rows(&json, query.geometry_column, config.id())?;
        let count = page.len();
        log::debug!("{}: offset={offset}, page={count}", config.id());

        all_parcels.extend(page);

        if count < query.limit as usize || count == 0 {
            break;
        }
        offset += count;
    }

    Ok(all_parcels)
}

/// Parses a SODA JSON response: an array of row objects.
///
/// # Errors
///
/// Returns [`ParcelError::InvalidResponse`] if the body is not an array,
/// which is how SODA reports query errors.
pub fn parse_rows(
    json: &serde_json::Value,
    geometry_column: &str,
    jurisdiction: &str,
) -> Result<Vec<RawParcel>, ParcelError> {
    let rows = json.as_array().ok_or_else(|| ParcelError::InvalidResponse {
        jurisdiction: jurisdiction.to_string(),
        message: format!(
            "Socrata query error: {}",
            json["message"].as_str().unwrap_or("response is not a row array")
        ),
    })?;

    Ok(rows
        .iter()
        .filter_map(|row| {
            let attributes = row.as_object()?.clone();
            let centroid = attributes.get(geometry_column).and_then(geometry_centroid);
            Some(RawParcel {
                attributes,
                centroid,
            })
        })
        .collect())
}

/// Centroid of a `GeoJSON` geometry value as SODA returns geometry columns.
fn geometry_centroid(value: &serde_json::Value) -> Option<GeoPoint> {
    let geometry = geojson::Geometry::from_json_value(value.clone()).ok()?;
    let geometry = geo::Geometry::<f64>::try_from(geometry).ok()?;
    let centroid = geometry.centroid()?;
    Some(GeoPoint::new(centroid.x(), centroid.y()))
}
