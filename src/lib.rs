//! quaketiles - windowed earthquake feed pipeline.
//!
//! Fetches a USGS summary feed for the selected time window, normalizes its
//! records into [`models::SeismicEvent`]s, classifies magnitudes into
//! colored marker tiers, and keeps a single [`store::EventStore`] snapshot
//! consistent while fetches race against window changes and refreshes.

pub mod classify;
pub mod client;
pub mod controller;
pub mod errors;
pub mod models;
pub mod normalize;
pub mod render;
pub mod server;
pub mod store;
