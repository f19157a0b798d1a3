//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use clap::{Parser, Subcommand};

use quaketiles::client::{REQUEST_TIMEOUT_SECS, TimeWindow, USGS_BASE_URL};
use quaketiles::render::Format;

/// Windowed earthquake feed with magnitude-tiered map markers.
#[derive(Parser, Debug)]
#[command(name = "quaketiles")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Base endpoint of the earthquake feed
    #[arg(long, global = true, env = "QUAKETILES_FEED_URL", default_value = USGS_BASE_URL)]
    pub feed_url: String,

    /// HTTP request timeout in seconds
    #[arg(long, global = true, default_value_t = REQUEST_TIMEOUT_SECS)]
    pub timeout: u64,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch one window and print its markers
    Snapshot(SnapshotArgs),

    /// Serve the map data and controls over HTTP
    Serve(ServeArgs),
}

/// Arguments for the `snapshot` command.
#[derive(Parser, Debug)]
pub struct SnapshotArgs {
    /// Time window to fetch
    #[arg(long, short = 'w', default_value = "day", value_parser = parse_window)]
    pub window: TimeWindow,

    /// Maximum number of markers to show
    #[arg(long, short = 'n', default_value = "50")]
    pub limit: usize,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `serve` command.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long, short = 'p', default_value = "8080")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Initially selected time window
    #[arg(long, short = 'w', default_value = "day", value_parser = parse_window)]
    pub window: TimeWindow,

    /// Refresh the selected window every N seconds (minimum 30)
    #[arg(long)]
    pub auto_refresh: Option<u64>,
}

/// Parse a time window from string.
fn parse_window(s: &str) -> Result<TimeWindow, String> {
    s.parse()
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}
