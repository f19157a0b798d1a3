//! Map renderer boundary.
//!
//! A [`Marker`] is everything a map widget needs to draw one event: where,
//! how big, what color, and the popup label. Renderers consume markers
//! projected from the store's current snapshot; the terminal renderer here
//! prints them in human-readable (with colors), JSON, or NDJSON form.

use std::io::{self, Write};

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::classify::{Tier, classify};
use crate::models::SeismicEvent;
use crate::store::EventStore;

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// Presentation format for event times.
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

/// One drawable marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f64,
    pub color: &'static str,
    pub tier: Tier,
    pub place: String,
    pub magnitude: Option<f64>,
    pub timestamp: DateTime<Utc>,
    /// Popup text: place, magnitude and local time on separate lines.
    pub label: String,
}

impl From<&SeismicEvent> for Marker {
    fn from(event: &SeismicEvent) -> Self {
        let encoding = classify(event.magnitude);
        let place = event.place_or_unknown().to_string();
        let label = format!(
            "{place}\nMagnitude: {}\nTime: {}",
            event
                .magnitude
                .map_or_else(|| "?".into(), |m| m.to_string()),
            local_time(event.timestamp)
        );

        Self {
            id: event.id.clone(),
            latitude: event.latitude,
            longitude: event.longitude,
            radius: encoding.radius,
            color: encoding.color,
            tier: encoding.tier,
            place,
            magnitude: event.magnitude,
            timestamp: event.timestamp,
            label,
        }
    }
}

/// One marker per event, in event order.
#[must_use]
pub fn markers(events: &[SeismicEvent]) -> Vec<Marker> {
    events.iter().map(Marker::from).collect()
}

/// Render an instant in the local timezone.
#[must_use]
pub fn local_time(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&Local).format(TIME_FORMAT).to_string()
}

/// Magnitude rounded for the terminal column.
fn magnitude_text(magnitude: Option<f64>) -> String {
    magnitude.map_or_else(|| "?".into(), |m| format!("{m:.1}"))
}

/// Anything that can draw a set of markers.
pub trait MapRenderer {
    /// Draw `markers`, replacing whatever was drawn before.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    fn render(&mut self, markers: &[Marker], loading: bool) -> io::Result<()>;
}

/// Draw the store's current snapshot with `renderer`.
///
/// # Errors
///
/// Propagates the renderer's error.
pub fn render_store<R: MapRenderer + ?Sized>(
    renderer: &mut R,
    store: &EventStore,
) -> io::Result<()> {
    let events = store.current_events();
    renderer.render(&markers(&events), store.is_loading())
}

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// JSON array
    Json,
    /// Newline-delimited JSON (one object per line)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

/// Terminal color closest to a tier's map color.
fn tier_ansi(tier: Tier) -> &'static str {
    match tier {
        Tier::Severe => "\x1b[91m",
        Tier::Strong => "\x1b[38;5;208m",
        Tier::Moderate => "\x1b[93m",
        Tier::Light => "\x1b[92m",
    }
}

/// Write markers in human-readable format, one line each.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_human<W: Write>(writer: &mut W, markers: &[Marker]) -> io::Result<()> {
    for marker in markers {
        let color = tier_ansi(marker.tier);
        let mag = magnitude_text(marker.magnitude);
        let tier = marker.tier.as_str();

        writeln!(
            writer,
            "{color}●{RESET} {color}{BOLD}M{mag:>4}{RESET} │ \
             {color}{tier:8}{RESET} │ \
             {DIM}r={radius:>4.1}{RESET} │ \
             {time} │ \
             {lat:>7.3},{lon:>8.3} │ \
             {place}",
            radius = marker.radius,
            time = local_time(marker.timestamp),
            lat = marker.latitude,
            lon = marker.longitude,
            place = marker.place,
        )?;
    }
    Ok(())
}

/// Write markers as a JSON array.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(writer: &mut W, markers: &[Marker]) -> io::Result<()> {
    let json = serde_json::to_string_pretty(markers)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Write markers as newline-delimited JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_ndjson<W: Write>(writer: &mut W, markers: &[Marker]) -> io::Result<()> {
    for marker in markers {
        let json = serde_json::to_string(marker)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{json}")?;
    }
    Ok(())
}

/// Write markers in the specified format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_markers<W: Write>(
    writer: &mut W,
    markers: &[Marker],
    format: Format,
) -> io::Result<()> {
    match format {
        Format::Human => write_human(writer, markers),
        Format::Json => write_json(writer, markers),
        Format::Ndjson => write_ndjson(writer, markers),
    }
}

/// Renderer that prints markers to a writer, newest first.
pub struct TerminalRenderer<W> {
    writer: W,
    format: Format,
    limit: usize,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(writer: W, format: Format, limit: usize) -> Self {
        Self {
            writer,
            format,
            limit,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> MapRenderer for TerminalRenderer<W> {
    fn render(&mut self, markers: &[Marker], loading: bool) -> io::Result<()> {
        let mut sorted: Vec<Marker> = markers.to_vec();
        sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        sorted.truncate(self.limit);

        if loading && self.format == Format::Human {
            writeln!(self.writer, "{DIM}Refreshing...{RESET}")?;
        }
        write_markers(&mut self.writer, &sorted, self.format)?;
        self.writer.flush()
    }
}
