//! Normalizes raw source attributes into [`ParcelZoningRecord`] values.
//!
//! Uses the jurisdiction's [`ParcelFieldMapping`] to read each attribute
//! regardless of the API-specific field naming, and its feature flags to
//! decide which optional attributes exist at all.

use zone_map_jurisdiction::JurisdictionConfig;
use zone_map_jurisdiction_models::ParcelFieldMapping;
use zone_map_zoning_models::{GeoPoint, ParcelZoningRecord};

use crate::fetchers::RawParcel;

const SQUARE_FEET_PER_ACRE: f64 = 43_560.0;

/// Attribute names a query must return for this jurisdiction, in mapping
/// order without duplicates.
#[must_use]
pub fn requested_fields(config: &JurisdictionConfig) -> Vec<&str> {
    let fields = config.fields();
    let features = config.features();

    let optional = [
        (fields.zone_description.as_deref(), true),
        (fields.future_land_use.as_deref(), features.future_land_use),
        (fields.future_changed.as_deref(), features.future_changed),
        (fields.split_zoned.as_deref(), features.split_zoning),
        (fields.area_acres.as_deref(), true),
        (fields.area_sqft.as_deref(), true),
        (fields.latitude.as_deref(), true),
        (fields.longitude.as_deref(), true),
    ];

    let mut names = vec![fields.parcel_id.as_str(), fields.zone_code.as_str()];
    for name in optional
        .into_iter()
        .filter_map(|(name, enabled)| name.filter(|_| enabled))
    {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Normalizes a list of raw parcels.
///
/// Skips parcels without an identifier.
#[must_use]
pub fn normalize_parcels(
    parcels: &[RawParcel],
    config: &JurisdictionConfig,
    fallback: GeoPoint,
) -> Vec<ParcelZoningRecord> {
    let records: Vec<_> = parcels
        .iter()
        .filter_map(|parcel| normalize_parcel(parcel, config, fallback))
        .collect();
    let skipped = parcels.len() - records.len();
    if skipped > 0 {
        log::debug!("{}: skipped {skipped} parcels without an id", config.id());
    }
    records
}

/// Normalizes a single raw parcel. `fallback` is used as the location when
/// the source gives neither coordinates nor geometry.
#[must_use]
pub fn normalize_parcel(
    parcel: &RawParcel,
    config: &JurisdictionConfig,
    fallback: GeoPoint,
) -> Option<ParcelZoningRecord> {
    let fields = config.fields();
    let features = config.features();
    let attrs = &parcel.attributes;

    let parcel_id = read_string(attrs, &fields.parcel_id)?;
    let raw_zone_code = read_string(attrs, &fields.zone_code).unwrap_or_default();

    let zone_description = read_optional(attrs, fields.zone_description.as_deref());
    let future_land_use = if features.future_land_use {
        read_optional(attrs, fields.future_land_use.as_deref())
    } else {
        None
    };

    let future_changed = features.future_changed
        && fields
            .future_changed
            .as_deref()
            .is_some_and(|name| read_flag(attrs, name));

    let split_flagged = features.split_zoning
        && fields
            .split_zoned
            .as_deref()
            .is_some_and(|name| read_flag(attrs, name));
    let split_zoned = split_flagged || config.vocabulary().is_split_code(&raw_zone_code);

    Some(ParcelZoningRecord {
        parcel_id,
        raw_zone_code,
        zone_description,
        future_land_use,
        area_acres: read_area(attrs, fields),
        split_zoned,
        future_changed,
        location: read_location(attrs, fields)
            .or(parcel.centroid)
            .unwrap_or(fallback),
    })
}

type Attributes = serde_json::Map<String, serde_json::Value>;

/// Reads a trimmed, non-empty string. Numeric values are stringified so
/// numeric parcel ids survive.
fn read_string(attrs: &Attributes, name: &str) -> Option<String> {
    match attrs.get(name)? {
        serde_json::Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn read_optional(attrs: &Attributes, name: Option<&str>) -> Option<String> {
    name.and_then(|name| read_string(attrs, name))
}

/// Reads a number, accepting numeric strings.
fn read_number(attrs: &Attributes, name: &str) -> Option<f64> {
    let value = match attrs.get(name)? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|n| n.is_finite())
}

/// Reads an indicator flag: `Y`/`YES`/`T`/`TRUE`/`1`/`X`, a JSON boolean, or
/// any nonzero number.
fn read_flag(attrs: &Attributes, name: &str) -> bool {
    match attrs.get(name) {
        Some(serde_json::Value::Bool(b)) => *b,
        Some(serde_json::Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(serde_json::Value::String(s)) => matches!(
            s.trim().to_uppercase().as_str(),
            "Y" | "YES" | "T" | "TRUE" | "1" | "X"
        ),
        _ => false,
    }
}

fn read_area(attrs: &Attributes, fields: &ParcelFieldMapping) -> Option<f64> {
    if let Some(acres) = fields
        .area_acres
        .as_deref()
        .and_then(|name| read_number(attrs, name))
    {
        return Some(acres);
    }
    fields
        .area_sqft
        .as_deref()
        .and_then(|name| read_number(attrs, name))
        .map(|sqft| sqft / SQUARE_FEET_PER_ACRE)
}

fn read_location(attrs: &Attributes, fields: &ParcelFieldMapping) -> Option<GeoPoint> {
    let latitude = read_number(attrs, fields.latitude.as_deref()?)?;
    let longitude = read_number(attrs, fields.longitude.as_deref()?)?;
    Some(GeoPoint::new(longitude, latitude)).filter(GeoPoint::is_valid)
}
