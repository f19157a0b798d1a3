//! Event store.
//!
//! Single owner of the view state: the selected window, the fetch state
//! machine, and the last committed event snapshot. Every fetch is tagged
//! with a [`FetchToken`]; only the most recently issued token may commit,
//! so a slow response from a superseded fetch can never overwrite a newer
//! one.
//!
//! The internal mutex is only held for field updates, never across an
//! `.await`, so render-side reads do not wait on network I/O.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::client::TimeWindow;
use crate::errors::FetchError;
use crate::models::SeismicEvent;
use crate::normalize::Normalized;

/// Identifies one fetch generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchToken {
    generation: u64,
    window: TimeWindow,
}

impl FetchToken {
    #[must_use]
    pub fn generation(self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn window(self) -> TimeWindow {
        self.window
    }
}

/// Lifecycle of the most recently issued fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState {
    Idle,
    Loading(TimeWindow),
    Loaded {
        window: TimeWindow,
        events: Arc<[SeismicEvent]>,
    },
    Failed {
        window: TimeWindow,
        error: FetchError,
    },
}

impl FetchState {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading(_) => "loading",
            Self::Loaded { .. } => "loaded",
            Self::Failed { .. } => "failed",
        }
    }
}

/// What `commit` did with a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied,
    /// A newer fetch was issued or the window changed; the result was discarded.
    Stale,
}

/// Read-only summary for status displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStatus {
    pub window: TimeWindow,
    pub state: &'static str,
    pub loading: bool,
    pub event_count: usize,
    pub skipped: usize,
    pub generation: u64,
    pub error: Option<String>,
    pub loaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct Inner {
    window: TimeWindow,
    state: FetchState,
    /// Generation of the latest issued token, 0 before the first fetch.
    latest: u64,
    snapshot: Arc<[SeismicEvent]>,
    skipped: usize,
    loaded_at: Option<DateTime<Utc>>,
    last_error: Option<FetchError>,
}

/// Process-wide view state. Share it behind an [`Arc`].
#[derive(Debug)]
pub struct EventStore {
    inner: Mutex<Inner>,
    changes: watch::Sender<u64>,
}

impl EventStore {
    /// Create an idle store with `window` selected.
    #[must_use]
    pub fn new(window: TimeWindow) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            inner: Mutex::new(Inner {
                window,
                state: FetchState::Idle,
                latest: 0,
                snapshot: Arc::from(Vec::new()),
                skipped: 0,
                loaded_at: None,
                last_error: None,
            }),
            changes,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // State is only ever replaced field-by-field, so a poisoned guard is still coherent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        self.changes.send_modify(|version| *version += 1);
    }

    /// Record the selected window. Does not fetch.
    pub fn set_window(&self, window: TimeWindow) {
        self.lock().window = window;
        self.notify();
    }

    #[must_use]
    pub fn window(&self) -> TimeWindow {
        self.lock().window
    }

    /// Start a new fetch generation for `window`.
    ///
    /// Any fetch still in flight is superseded: its eventual commit will be
    /// reported as [`CommitOutcome::Stale`].
    pub fn begin_fetch(&self, window: TimeWindow) -> FetchToken {
        let token = Self::issue(&mut self.lock(), window);
        self.notify();
        token
    }

    /// Start a new fetch generation for the selected window.
    pub fn begin_current(&self) -> FetchToken {
        let token = {
            let mut inner = self.lock();
            let window = inner.window;
            Self::issue(&mut inner, window)
        };
        self.notify();
        token
    }

    /// Select `window` and start a fetch for it in one step.
    ///
    /// Returns `None` without touching the state if `window` is already
    /// selected.
    pub fn select_window(&self, window: TimeWindow) -> Option<FetchToken> {
        let token = {
            let mut inner = self.lock();
            if inner.window == window {
                return None;
            }
            inner.window = window;
            Self::issue(&mut inner, window)
        };
        self.notify();
        Some(token)
    }

    fn issue(inner: &mut Inner, window: TimeWindow) -> FetchToken {
        inner.latest += 1;
        inner.state = FetchState::Loading(window);
        debug!(
            "fetch generation {} started for {} window",
            inner.latest, window
        );
        FetchToken {
            generation: inner.latest,
            window,
        }
    }

    /// Apply a fetch result if `token` is still the latest generation and
    /// its window is still the selected one.
    ///
    /// A failure keeps the previous snapshot visible.
    pub fn commit(
        &self,
        token: FetchToken,
        result: Result<Normalized, FetchError>,
    ) -> CommitOutcome {
        {
            let mut inner = self.lock();
            if token.generation != inner.latest {
                debug!(
                    "discarding stale generation {} (latest is {})",
                    token.generation, inner.latest
                );
                return CommitOutcome::Stale;
            }
            if token.window != inner.window {
                debug!(
                    "discarding {} window result, {} is selected",
                    token.window, inner.window
                );
                return CommitOutcome::Stale;
            }

            match result {
                Ok(normalized) => {
                    let events: Arc<[SeismicEvent]> = normalized.events.into();
                    info!(
                        "loaded {} events for {} window ({} skipped)",
                        events.len(),
                        token.window,
                        normalized.skipped
                    );
                    inner.snapshot = Arc::clone(&events);
                    inner.skipped = normalized.skipped;
                    inner.loaded_at = Some(Utc::now());
                    inner.last_error = None;
                    inner.state = FetchState::Loaded {
                        window: token.window,
                        events,
                    };
                }
                Err(error) => {
                    warn!("{error}");
                    inner.last_error = Some(error.clone());
                    inner.state = FetchState::Failed {
                        window: token.window,
                        error,
                    };
                }
            }
        }
        self.notify();
        CommitOutcome::Applied
    }

    /// The last successfully committed events, empty if none yet.
    #[must_use]
    pub fn current_events(&self) -> Arc<[SeismicEvent]> {
        Arc::clone(&self.lock().snapshot)
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self.lock().state, FetchState::Loading(_))
    }

    #[must_use]
    pub fn state(&self) -> FetchState {
        self.lock().state.clone()
    }

    #[must_use]
    pub fn status(&self) -> StoreStatus {
        let inner = self.lock();
        StoreStatus {
            window: inner.window,
            state: inner.state.name(),
            loading: matches!(inner.state, FetchState::Loading(_)),
            event_count: inner.snapshot.len(),
            skipped: inner.skipped,
            generation: inner.latest,
            error: inner.last_error.as_ref().map(ToString::to_string),
            loaded_at: inner.loaded_at,
        }
    }

    /// Subscribe to change notifications; the value is a change counter.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new(TimeWindow::default())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn event(id: &str) -> SeismicEvent {
        SeismicEvent {
            id: id.into(),
            place: None,
            magnitude: Some(3.0),
            timestamp: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
            latitude: 0.0,
            longitude: 0.0,
            depth_km: None,
        }
    }

    fn batch(ids: &[&str]) -> Result<Normalized, FetchError> {
        Ok(Normalized {
            events: ids.iter().map(|id| event(id)).collect(),
            skipped: 0,
        })
    }

    fn ids(store: &EventStore) -> Vec<String> {
        store.current_events().iter().map(|e| e.id.clone()).collect()
    }

    #[test]
    fn test_starts_idle_and_empty() {
        let store = EventStore::default();
        assert_eq!(store.state(), FetchState::Idle);
        assert!(store.current_events().is_empty());
        assert!(!store.is_loading());
        assert_eq!(store.window(), TimeWindow::Day);
    }

    #[test]
    fn test_begin_and_commit() {
        let store = EventStore::default();
        let token = store.begin_fetch(TimeWindow::Day);
        assert!(store.is_loading());
        assert_eq!(store.state(), FetchState::Loading(TimeWindow::Day));

        assert_eq!(store.commit(token, batch(&["a", "b"])), CommitOutcome::Applied);
        assert!(!store.is_loading());
        assert_eq!(ids(&store), ["a", "b"]);
        assert!(matches!(store.state(), FetchState::Loaded { window: TimeWindow::Day, .. }));
    }

    #[test]
    fn test_stale_token_is_discarded() {
        let store = EventStore::new(TimeWindow::Week);
        let first = store.begin_fetch(TimeWindow::Week);
        let second = store.begin_fetch(TimeWindow::Week);
        assert!(second.generation() > first.generation());

        assert_eq!(store.commit(second, batch(&["week"])), CommitOutcome::Applied);
        assert_eq!(store.commit(first, batch(&["older"])), CommitOutcome::Stale);
        assert_eq!(ids(&store), ["week"]);
    }

    #[test]
    fn test_superseded_fetch_stays_loading() {
        let store = EventStore::default();
        let first = store.begin_fetch(TimeWindow::Day);
        let _second = store.begin_fetch(TimeWindow::Day);

        assert_eq!(store.commit(first, batch(&["old"])), CommitOutcome::Stale);
        assert!(store.is_loading());
        assert!(store.current_events().is_empty());
    }

    #[test]
    fn test_failure_keeps_previous_snapshot() {
        let store = EventStore::default();
        let token = store.begin_fetch(TimeWindow::Day);
        store.commit(token, batch(&["kept"]));

        let token = store.begin_fetch(TimeWindow::Day);
        let outcome = store.commit(token, Err(FetchError::new(TimeWindow::Day, "boom")));
        assert_eq!(outcome, CommitOutcome::Applied);
        assert_eq!(ids(&store), ["kept"]);
        assert!(matches!(store.state(), FetchState::Failed { .. }));

        let status = store.status();
        assert_eq!(status.state, "failed");
        assert_eq!(status.event_count, 1);
        assert!(status.error.unwrap().contains("boom"));
    }

    #[test]
    fn test_success_clears_error() {
        let store = EventStore::default();
        let token = store.begin_fetch(TimeWindow::Day);
        store.commit(token, Err(FetchError::new(TimeWindow::Day, "down")));
        let token = store.begin_fetch(TimeWindow::Day);
        store.commit(token, batch(&[]));

        let status = store.status();
        assert_eq!(status.error, None);
        assert!(status.loaded_at.is_some());
    }

    #[test]
    fn test_set_window_does_not_fetch() {
        let store = EventStore::default();
        store.set_window(TimeWindow::Week);
        assert_eq!(store.window(), TimeWindow::Week);
        assert_eq!(store.state(), FetchState::Idle);
        assert_eq!(store.status().generation, 0);
    }

    #[test]
    fn test_result_for_deselected_window_is_discarded() {
        let store = EventStore::default();
        store.set_window(TimeWindow::Hour);
        store.set_window(TimeWindow::Week);
        let _week = store.begin_fetch(TimeWindow::Week);
        let hour = store.begin_fetch(TimeWindow::Hour);

        assert_eq!(store.commit(hour, batch(&["hour"])), CommitOutcome::Stale);
        assert!(store.current_events().is_empty());
        assert!(!matches!(store.state(), FetchState::Loaded { .. }));
    }

    #[test]
    fn test_select_window_is_atomic() {
        let store = EventStore::default();
        assert!(store.select_window(TimeWindow::Day).is_none());
        assert_eq!(store.state(), FetchState::Idle);

        let hour = store.select_window(TimeWindow::Hour).unwrap();
        let week = store.select_window(TimeWindow::Week).unwrap();
        assert_eq!(week.window(), TimeWindow::Week);
        assert_eq!(store.window(), TimeWindow::Week);

        assert_eq!(store.commit(hour, batch(&["hour"])), CommitOutcome::Stale);
        assert_eq!(store.commit(week, batch(&["week"])), CommitOutcome::Applied);
        assert_eq!(ids(&store), ["week"]);
    }

    #[test]
    fn test_begin_current_uses_selected_window() {
        let store = EventStore::new(TimeWindow::Week);
        let token = store.begin_current();
        assert_eq!(token.window(), TimeWindow::Week);
        assert_eq!(store.state(), FetchState::Loading(TimeWindow::Week));
    }

    #[test]
    fn test_subscribers_see_changes() {
        let store = EventStore::default();
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        let token = store.begin_fetch(TimeWindow::Day);
        assert!(rx.has_changed().unwrap());
        rx.mark_unchanged();

        store.commit(token, batch(&["a"]));
        assert!(rx.has_changed().unwrap());
    }
}
