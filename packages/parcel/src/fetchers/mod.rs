//! Fetcher dispatch and implementations for different parcel API types.
//!
//! Each fetcher turns a point (or a point and radius) into that API's
//! spatial query, pages through the results, and returns raw attribute
//! maps with a representative location when the geometry allows one.

pub mod arcgis;
pub mod socrata;

use std::time::Duration;

use zone_map_jurisdiction::JurisdictionConfig;
use zone_map_jurisdiction_models::ParcelFetcherConfig;
use zone_map_zoning_models::GeoPoint;

use crate::ParcelError;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// A parcel as returned by a source, before field normalization.
#[derive(Debug, Clone, Default)]
pub struct RawParcel {
    /// Source attributes under the jurisdiction's own field names.
    pub attributes: serde_json::Map<String, serde_json::Value>,
    /// Centroid of the parcel geometry, when geometry was returned.
    pub centroid: Option<GeoPoint>,
}

/// Fetches the raw parcels intersecting `point`.
///
/// # Errors
///
/// Returns [`ParcelError`] if the HTTP request or response parsing fails.
pub async fn fetch_at_point(
    client: &reqwest::Client,
    config: &JurisdictionConfig,
    point: GeoPoint,
    request_timeout: Duration,
) -> Result<Vec<RawParcel>, ParcelError> {
    match config.fetcher() {
        ParcelFetcherConfig::Arcgis {
            url, where_clause, ..
        } => {
            arcgis::fetch_at_point(
                client,
                config,
                url,
                where_clause.as_deref(),
                point,
                request_timeout,
            )
            .await
        }
        ParcelFetcherConfig::Socrata {
            url,
            geometry_column,
            ..
        } => {
            socrata::fetch_at_point(client, config, url, geometry_column, point, request_timeout)
                .await
        }
    }
}

/// Fetches every raw parcel within `radius_meters` of `point`, across all
/// result pages.
///
/// # Errors
///
/// Returns [`ParcelError`] if any HTTP request or response parsing fails.
pub async fn fetch_within(
    client: &reqwest::Client,
    config: &JurisdictionConfig,
    point: GeoPoint,
    radius_meters: f64,
    request_timeout: Duration,
) -> Result<Vec<RawParcel>, ParcelError> {
    match config.fetcher() {
        ParcelFetcherConfig::Arcgis {
            url,
            page_size,
            where_clause,
        } => {
            arcgis::fetch_within(
                client,
                config,
                &arcgis::RadiusQuery {
                    url,
                    where_clause: where_clause.as_deref(),
                    page_size: page_size.unwrap_or(arcgis::DEFAULT_PAGE_SIZE),
                    point,
                    radius_meters,
                },
                request_timeout,
            )
            .await
        }
        ParcelFetcherConfig::Socrata {
            url,
            geometry_column,
            limit,
        } => {
            socrata::fetch_within(
                client,
                config,
                &socrata::RadiusQuery {
                    url,
                    geometry_column,
                    limit: limit.unwrap_or(socrata::DEFAULT_LIMIT),
                    point,
                    radius_meters,
                },
                request_timeout,
            )
            .await
        }
    }
}

/// Sends a request and parses the body as JSON.
///
/// Connection failures, timeouts, and 5xx responses become
/// [`ParcelError::DataSourceUnavailable`] / [`ParcelError::Timeout`]; other
/// non-success statuses and unparseable bodies become
/// [`ParcelError::InvalidResponse`]. No retries: callers layer their own.
async fn send_json(
    request: reqwest::RequestBuilder,
    jurisdiction: &str,
    request_timeout: Duration,
) -> Result<serde_json::Value, ParcelError> {
    let response = request
        .send()
        .await
        .map_err(|e| ParcelError::from_reqwest(jurisdiction, &e, request_timeout))?;

    let url = response.url().to_string();
    let status = response.status();

    if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(ParcelError::DataSourceUnavailable {
            jurisdiction: jurisdiction.to_string(),
            message: format!("HTTP {status}"),
        });
    }
    if !status.is_success() {
        return Err(ParcelError::InvalidResponse {
            jurisdiction: jurisdiction.to_string(),
            message: format!("HTTP {status}"),
        });
    }

    let text = response
        .text()
        .await
        .map_err(|e| ParcelError::from_reqwest(jurisdiction, &e, request_timeout))?;

    serde_json::from_str(&text).map_err(|json_err| {
        let preview = if text.len() > BODY_PREVIEW_LEN {
            format!("{}...", text.chars().take(BODY_PREVIEW_LEN).collect::<String>())
        } else {
            text.clone()
        };
        log::error!(
            "JSON parse failed.\n  \
             url: {url}\n  \
             status: {status}\n  \
             received: {} bytes\n  \
             parse error: {json_err}\n  \
             body preview: {preview}",
            text.len(),
        );
        ParcelError::InvalidResponse {
            jurisdiction: jurisdiction.to_string(),
            message: format!("JSON parse failed: {json_err}"),
        }
    })
}
