//! Feed record normalization.
//!
//! Turns raw GeoJSON feature records into [`SeismicEvent`]s. Individual
//! records are coerced defensively: bad optional fields become `None`, and
//! records that cannot be placed on a map are skipped and counted. Only a
//! payload whose feature container is not an array fails outright.

use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::QuaketilesError;
use crate::models::SeismicEvent;

/// Result of normalizing one feed payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub events: Vec<SeismicEvent>,
    /// Records dropped for a missing id, coordinates, or time.
    pub skipped: usize,
}

/// Normalize a complete feed body.
///
/// Accepts a `FeatureCollection` object or a bare array of features.
///
/// # Errors
///
/// Returns [`QuaketilesError::MalformedFeed`] if no feature array can be
/// found at the top level.
pub fn normalize_feed(body: &Value) -> Result<Normalized, QuaketilesError> {
    match body {
        Value::Array(_) => normalize(body),
        Value::Object(map) => {
            if let Some(kind) = map.get("type").and_then(Value::as_str) {
                if kind != "FeatureCollection" {
                    return Err(QuaketilesError::MalformedFeed(format!(
                        "expected type 'FeatureCollection', got '{kind}'"
                    )));
                }
            }
            let features = map.get("features").ok_or_else(|| {
                QuaketilesError::MalformedFeed("missing 'features' member".into())
            })?;
            normalize(features)
        }
        other => Err(QuaketilesError::MalformedFeed(format!(
            "expected a feature collection, got {}",
            json_kind(other)
        ))),
    }
}

/// Normalize a list of raw feature records.
///
/// # Errors
///
/// Returns [`QuaketilesError::MalformedFeed`] if `features` is not an array.
pub fn normalize(features: &Value) -> Result<Normalized, QuaketilesError> {
    let records = features.as_array().ok_or_else(|| {
        QuaketilesError::MalformedFeed(format!(
            "'features' must be an array, got {}",
            json_kind(features)
        ))
    })?;

    let mut out = Normalized {
        events: Vec::with_capacity(records.len()),
        skipped: 0,
    };
    let mut seen = HashSet::with_capacity(records.len());

    for record in records {
        match normalize_record(record) {
            Some(event) if seen.insert(event.id.clone()) => out.events.push(event),
            _ => out.skipped += 1,
        }
    }

    debug!(
        "normalized {} events ({} skipped)",
        out.events.len(),
        out.skipped
    );
    Ok(out)
}

/// Convert one raw record, or `None` if it cannot be placed.
fn normalize_record(record: &Value) -> Option<SeismicEvent> {
    let record = record.as_object()?;

    let id = record
        .get("id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())?;

    let empty = Map::new();
    let properties = record
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    // GeoJSON order is [longitude, latitude, depth]
    let coordinates = record
        .get("geometry")
        .and_then(|g| g.get("coordinates"))
        .and_then(Value::as_array)?;
    let longitude = finite(coordinates.first())?;
    let latitude = finite(coordinates.get(1))?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return None;
    }

    let timestamp = event_time(properties.get("time"))?;

    let place = properties
        .get("place")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(ToString::to_string);

    Some(SeismicEvent {
        id: id.to_string(),
        place,
        magnitude: finite(properties.get("mag")),
        timestamp,
        latitude,
        longitude,
        depth_km: finite(coordinates.get(2)),
    })
}

/// A JSON number that is a finite `f64`; strings and nulls do not count.
fn finite(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|v| v.is_finite())
}

/// Epoch milliseconds to an instant.
#[allow(clippy::cast_possible_truncation)]
fn event_time(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let value = value?;
    let millis = match value.as_i64() {
        Some(ms) => ms,
        None => value.as_f64().filter(|v| v.is_finite())?.trunc() as i64,
    };
    Utc.timestamp_millis_opt(millis).single()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
