//! Error types for quaketiles.
//!
//! Uses `thiserror` for library-style error definitions.

use thiserror::Error;

use crate::client::TimeWindow;

/// Errors that can occur while acquiring or decoding a feed.
#[derive(Error, Debug)]
pub enum QuaketilesError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Feed endpoint returned an error status
    #[error("feed API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Top-level payload is not a usable feature container
    #[error("malformed feed: {0}")]
    MalformedFeed(String),
}

/// A failed fetch attempt for one window.
///
/// Cloneable so it can live inside the store's `Failed` state and be handed
/// to any number of readers; the underlying cause is flattened to text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("fetch for {window} window failed: {cause}")]
pub struct FetchError {
    pub window: TimeWindow,
    pub cause: String,
}

impl FetchError {
    #[must_use]
    pub fn new(window: TimeWindow, cause: impl Into<String>) -> Self {
        Self {
            window,
            cause: cause.into(),
        }
    }

    /// Wrap a pipeline error as the failure of `window`'s fetch.
    #[must_use]
    pub fn from_error(window: TimeWindow, err: &QuaketilesError) -> Self {
        Self::new(window, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::from_error(
            TimeWindow::Week,
            &QuaketilesError::Api {
                status: 503,
                message: "unavailable".into(),
            },
        );
        assert_eq!(
            err.to_string(),
            "fetch for week window failed: feed API error (HTTP 503): unavailable"
        );
    }
}
