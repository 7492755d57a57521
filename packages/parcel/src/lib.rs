#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Parcel zoning data access.
//!
//! Each jurisdiction serves parcels from its own endpoint with its own
//! attribute names. The [`ParcelSource`] trait is the uniform contract:
//! fetch the parcel containing a point, and fetch the parcels within a
//! radius of it, both as canonical [`ParcelZoningRecord`]s. The HTTP
//! implementation is [`ParcelGateway`]; query construction per API type
//! lives in [`fetchers`] and attribute mapping in [`normalize`].

pub mod fetchers;
pub mod normalize;

#[cfg(test)]
mod test_server;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use zone_map_jurisdiction::JurisdictionConfig;
use zone_map_zoning_models::{GeoPoint, ParcelZoningRecord};

/// Errors that can occur while fetching parcel data.
#[derive(Debug, Error)]
pub enum ParcelError {
    /// Network failure or server error reaching the data source.
    #[error("Data source unavailable for '{jurisdiction}': {message}")]
    DataSourceUnavailable {
        /// Jurisdiction whose source failed.
        jurisdiction: String,
        /// Description of the failure.
        message: String,
    },

    /// The fetch did not complete within its time budget.
    #[error("Data source for '{jurisdiction}' timed out after {after:?}")]
    Timeout {
        /// Jurisdiction whose source timed out.
        jurisdiction: String,
        /// The elapsed budget.
        after: Duration,
    },

    /// The source answered, but not with parcel data we can read.
    #[error("Invalid response from '{jurisdiction}': {message}")]
    InvalidResponse {
        /// Jurisdiction whose source answered badly.
        jurisdiction: String,
        /// Description of what went wrong.
        message: String,
    },
}

impl ParcelError {
    /// Returns `true` for failures that may succeed on a later attempt
    /// (network errors, 5xx, timeouts).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::DataSourceUnavailable { .. } | Self::Timeout { .. }
        )
    }

    fn from_reqwest(jurisdiction: &str, e: &reqwest::Error, after: Duration) -> Self {
        if e.is_timeout() {
            Self::Timeout {
                jurisdiction: jurisdiction.to_string(),
                after,
            }
        } else {
            Self::DataSourceUnavailable {
                jurisdiction: jurisdiction.to_string(),
                message: e.to_string(),
            }
        }
    }
}

/// Results of the two independent neighborhood fetches.
#[derive(Debug)]
pub struct NeighborhoodFetch {
    /// The parcel containing the point.
    pub current: Result<Option<ParcelZoningRecord>, ParcelError>,
    /// Parcels within the radius, never including `current`.
    pub nearby: Result<Vec<ParcelZoningRecord>, ParcelError>,
}

/// Uniform parcel data contract over heterogeneous jurisdiction sources.
#[async_trait]
pub trait ParcelSource: Send + Sync {
    /// Fetches the parcel containing `point`. `Ok(None)` means the point is
    /// valid but lies on no parcel (road, water).
    ///
    /// # Errors
    ///
    /// Returns [`ParcelError`] if the data source fails.
    async fn current_parcel(
        &self,
        config: &JurisdictionConfig,
        point: GeoPoint,
    ) -> Result<Option<ParcelZoningRecord>, ParcelError>;

    /// Fetches parcels within `radius_meters` of `point`, deduplicated by
    /// parcel id and sorted by id. Zero parcels is a successful empty
    /// result.
    ///
    /// # Errors
    ///
    /// Returns [`ParcelError`] if the data source fails.
    async fn nearby_parcels(
        &self,
        config: &JurisdictionConfig,
        point: GeoPoint,
        radius_meters: f64,
    ) -> Result<Vec<ParcelZoningRecord>, ParcelError>;

    /// Runs both fetches concurrently, each bounded by `timeout`, and
    /// removes the current parcel from the nearby results by id.
    async fn fetch_neighborhood(
        &self,
        config: &JurisdictionConfig,
        point: GeoPoint,
        radius_meters: f64,
        timeout: Duration,
    ) -> NeighborhoodFetch {
        let (current, nearby) = tokio::join!(
            bounded(self.current_parcel(config, point), config.id(), timeout),
            bounded(
                self.nearby_parcels(config, point, radius_meters),
                config.id(),
                timeout
            ),
        );

        let nearby = nearby.map(|parcels| match &current {
            Ok(Some(subject)) => exclude_parcel(parcels, &subject.parcel_id),
            _ => parcels,
        });

        NeighborhoodFetch { current, nearby }
    }
}

/// Bounds a fetch by `timeout`, mapping expiry to [`ParcelError::Timeout`].
async fn bounded<T, F>(fut: F, jurisdiction: &str, timeout: Duration) -> Result<T, ParcelError>
where
    F: Future<Output = Result<T, ParcelError>>,
{
    tokio::time::timeout(timeout, fut).await.unwrap_or_else(|_| {
        Err(ParcelError::Timeout {
            jurisdiction: jurisdiction.to_string(),
            after: timeout,
        })
    })
}

/// Removes every record with `parcel_id` from `parcels`.
#[must_use]
pub fn exclude_parcel(parcels: Vec<ParcelZoningRecord>, parcel_id: &str) -> Vec<ParcelZoningRecord> {
    let before = parcels.len();
    let kept: Vec<_> = parcels
        .into_iter()
        .filter(|p| p.parcel_id != parcel_id)
        .collect();
    if kept.len() != before {
        log::debug!("Excluded subject parcel {parcel_id} from nearby results");
    }
    kept
}

/// Deduplicates records by parcel id (first occurrence wins) and sorts by
/// id so results do not depend on page order.
#[must_use]
pub fn dedupe_by_id(parcels: Vec<ParcelZoningRecord>) -> Vec<ParcelZoningRecord> {
    let mut by_id = BTreeMap::new();
    for parcel in parcels {
        by_id.entry(parcel.parcel_id.clone()).or_insert(parcel);
    }
    by_id.into_values().collect()
}

/// HTTP parcel gateway dispatching on each jurisdiction's fetcher config.
#[derive(Debug, Clone)]
pub struct ParcelGateway {
    client: reqwest::Client,
    request_timeout: Duration,
}

impl ParcelGateway {
    /// Creates a gateway whose individual HTTP requests are bounded by
    /// `request_timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] if the HTTP client cannot be built.
    pub fn new(request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            request_timeout,
        })
    }

    /// Creates a gateway around an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client, request_timeout: Duration) -> Self {
        Self {
            client,
            request_timeout,
        }
    }
}

#[async_trait]
impl ParcelSource for ParcelGateway {
    async fn current_parcel(
        &self,
        config: &JurisdictionConfig,
        point: GeoPoint,
    ) -> Result<Option<ParcelZoningRecord>, ParcelError> {
        let raw = fetchers::fetch_at_point(&self.client, config, point, self.request_timeout).await?;
        let parcel = raw
            .iter()
            .find_map(|r| normalize::normalize_parcel(r, config, point));
        if parcel.is_none() {
            log::debug!(
                "{}: no parcel at ({}, {})",
                config.id(),
                point.longitude,
                point.latitude
            );
        }
        Ok(parcel)
    }

    async fn nearby_parcels(
        &self,
        config: &JurisdictionConfig,
        point: GeoPoint,
        radius_meters: f64,
    ) -> Result<Vec<ParcelZoningRecord>, ParcelError> {
        let raw = fetchers::fetch_within(
            &self.client,
            config,
            point,
            radius_meters,
            self.request_timeout,
        )
        .await?;
        let parcels = normalize::normalize_parcels(&raw, config, point);
        let parcels = dedupe_by_id(parcels);
        log::debug!(
            "{}: {} parcels within {radius_meters} m",
            config.id(),
            parcels.len()
        );
        Ok(parcels)
    }
}
