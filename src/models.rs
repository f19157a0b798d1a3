//! Canonical event model.
//!
//! Feed records arrive as loosely typed GeoJSON features; everything past
//! the normalizer works with [`SeismicEvent`] only.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single normalized earthquake event.
///
/// Immutable once built; fields are only set by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeismicEvent {
    /// Feed-supplied event ID, unique within a fetch batch
    pub id: String,

    /// Human-readable place description
    pub place: Option<String>,

    /// Magnitude value (may be negative for micro events)
    pub magnitude: Option<f64>,

    /// Origin time
    pub timestamp: DateTime<Utc>,

    /// Latitude in degrees, within [-90, 90]
    pub latitude: f64,

    /// Longitude in degrees, within [-180, 180]
    pub longitude: f64,

    /// Depth in kilometers (positive down), when the feed provides it
    pub depth_km: Option<f64>,
}

impl SeismicEvent {
    /// Place name for display.
    #[must_use]
    pub fn place_or_unknown(&self) -> &str {
        self.place.as_deref().unwrap_or("Unknown location")
    }
}
