//! quaketiles - earthquake map data from your terminal.
//!
//! Fetches windowed USGS feeds and serves magnitude-tiered markers for a
//! map view, or prints them as a one-shot snapshot.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

mod cli;

use cli::{Cli, Command};
use quaketiles::client::{FeedConfig, FeedSource, UsgsClient};
use quaketiles::controller::RefreshController;
use quaketiles::render::{self, TerminalRenderer};
use quaketiles::server;
use quaketiles::store::{EventStore, FetchState};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    let feed = FeedConfig {
        base_url: cli.feed_url.clone(),
        timeout: Duration::from_secs(cli.timeout),
    };

    let runtime = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;

    match cli.command {
        Command::Snapshot(args) => runtime.block_on(cmd_snapshot(&feed, args)),
        Command::Serve(args) => runtime.block_on(cmd_serve(&feed, args)),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn build_controller(
    feed: &FeedConfig,
    store: Arc<EventStore>,
) -> Result<RefreshController<dyn FeedSource>> {
    let client = UsgsClient::with_config(feed).context("failed to create feed client")?;
    let source: Arc<dyn FeedSource> = Arc::new(client);
    Ok(RefreshController::new(store, source))
}

/// Execute the `snapshot` command - one fetch, print markers.
async fn cmd_snapshot(feed: &FeedConfig, args: cli::SnapshotArgs) -> Result<()> {
    let store = Arc::new(EventStore::new(args.window));
    let controller = build_controller(feed, Arc::clone(&store))?;

    controller
        .start()
        .await
        .context("fetch task panicked")?;

    if let FetchState::Failed { error, .. } = store.state() {
        anyhow::bail!(error);
    }

    let stdout = io::stdout();
    let mut renderer = TerminalRenderer::new(stdout.lock(), args.format, args.limit);
    render::render_store(&mut renderer, &store)?;

    Ok(())
}

/// Execute the `serve` command - start the HTTP shell.
async fn cmd_serve(feed: &FeedConfig, args: cli::ServeArgs) -> Result<()> {
    let store = Arc::new(EventStore::new(args.window));
    let controller = build_controller(feed, store)?;

    let config = server::ServerConfig {
        port: args.port,
        host: args.host,
        auto_refresh: args.auto_refresh.map(Duration::from_secs),
    };

    println!("\x1b[1m🌍 quaketiles\x1b[0m");
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("  Local:   \x1b[96mhttp://{}:{}\x1b[0m", config.host, config.port);
    println!("  Window:  {}", args.window.label());
    println!("  Feed:    {}", feed.base_url);
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("\x1b[2mPress Ctrl+C to stop\x1b[0m\n");

    server::run_server(config, controller).await
}
