//! Refresh orchestration.
//!
//! Turns window changes and refresh requests into fetches and commits them
//! to the [`EventStore`]. A new trigger never cancels or waits for one in
//! flight; it only advances the store's generation, and the older result is
//! dropped when it arrives. Results therefore win by issuance order, not by
//! arrival order.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::client::{FeedSource, TimeWindow};
use crate::errors::FetchError;
use crate::normalize::normalize_feed;
use crate::store::{CommitOutcome, EventStore, FetchToken};

/// Lower bound for automatic refresh intervals, in seconds.
pub const MIN_AUTO_REFRESH_SECS: u64 = 30;

/// Sole writer of the event store.
pub struct RefreshController<F: ?Sized> {
    store: Arc<EventStore>,
    source: Arc<F>,
}

impl<F: ?Sized> Clone for RefreshController<F> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            source: Arc::clone(&self.source),
        }
    }
}

impl<F: FeedSource + ?Sized + 'static> RefreshController<F> {
    #[must_use]
    pub fn new(store: Arc<EventStore>, source: Arc<F>) -> Self {
        Self { store, source }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<EventStore> {
        &self.store
    }

    /// Fetch the currently selected window.
    pub fn start(&self) -> JoinHandle<CommitOutcome> {
        let token = self.store.begin_current();
        self.spawn_fetch(token)
    }

    /// Select `window` and fetch it, unless it is already selected.
    pub fn on_window_change(&self, window: TimeWindow) -> Option<JoinHandle<CommitOutcome>> {
        let Some(token) = self.store.select_window(window) else {
            debug!("window {} already selected", window);
            return None;
        };
        info!("window changed to {}", window);
        Some(self.spawn_fetch(token))
    }

    /// Refetch the current window, even if a fetch is already in flight.
    pub fn on_manual_refresh(&self) -> JoinHandle<CommitOutcome> {
        let token = self.store.begin_current();
        info!("manual refresh of {} window", token.window());
        self.spawn_fetch(token)
    }

    /// Issue a new fetch generation for `window`.
    ///
    /// Must be called within a tokio runtime. The returned handle resolves
    /// once the result has been committed or discarded; a result for a window
    /// other than the selected one is always discarded.
    pub fn trigger_fetch(&self, window: TimeWindow) -> JoinHandle<CommitOutcome> {
        let token = self.store.begin_fetch(window);
        self.spawn_fetch(token)
    }

    fn spawn_fetch(&self, token: FetchToken) -> JoinHandle<CommitOutcome> {
        let store = Arc::clone(&self.store);
        let source = Arc::clone(&self.source);
        let window = token.window();

        tokio::spawn(async move {
            let result = match source.fetch(window).await {
                Ok(body) => normalize_feed(&body),
                Err(e) => Err(e),
            }
            .map_err(|e| FetchError::from_error(window, &e));

            store.commit(token, result)
        })
    }

    /// Refresh the current window every `interval` until the task is aborted.
    ///
    /// Intervals below [`MIN_AUTO_REFRESH_SECS`] are clamped.
    pub fn run_auto_refresh(&self, interval: Duration) -> JoinHandle<()> {
        let interval = interval.max(Duration::from_secs(MIN_AUTO_REFRESH_SECS));
        let controller = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; the initial fetch is start()'s job.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                controller.on_manual_refresh();
            }
        })
    }
}
