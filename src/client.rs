//! USGS earthquake feed client.
//!
//! Provides async HTTP access to the windowed summary feeds.
//! Uses reqwest with rustls for TLS.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::errors::QuaketilesError;

/// Default request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// User agent string for API requests.
const USER_AGENT: &str = concat!("quaketiles/", env!("CARGO_PKG_VERSION"));

/// USGS base URL for earthquake feeds.
pub const USGS_BASE_URL: &str = "https://earthquake.usgs.gov";

/// Selectable recency window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Hour,
    #[default]
    Day,
    Week,
}

impl TimeWindow {
    pub const ALL: [Self; 3] = [Self::Hour, Self::Day, Self::Week];

    /// Window key used in feed URLs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
        }
    }

    /// Human-readable label for selectors.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Hour => "Past Hour",
            Self::Day => "Past Day",
            Self::Week => "Past Week",
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TimeWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            _ => Err(format!("unknown window: {s} (expected: hour, day, week)")),
        }
    }
}

/// Transport settings for [`UsgsClient`].
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Base endpoint, without trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: USGS_BASE_URL.to_string(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Anything that can produce the raw feed body for a window.
///
/// The refresh controller only talks to this trait, so tests can script
/// responses and their arrival order.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the raw, untyped JSON body for `window`.
    async fn fetch(&self, window: TimeWindow) -> Result<Value, QuaketilesError>;
}

/// Client for the USGS summary feeds.
pub struct UsgsClient {
    client: Client,
    base_url: String,
}

impl UsgsClient {
    /// Create a client against the public USGS endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new() -> Result<Self, QuaketilesError> {
        Self::with_config(&FeedConfig::default())
    }

    /// Create a client from explicit transport settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn with_config(config: &FeedConfig) -> Result<Self, QuaketilesError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// URL of the summary feed for `window`.
    #[must_use]
    pub fn feed_url(&self, window: TimeWindow) -> String {
        format!(
            "{}/earthquakes/feed/v1.0/summary/all_{}.geojson",
            self.base_url,
            window.as_str()
        )
    }
}

#[async_trait]
impl FeedSource for UsgsClient {
    #[instrument(skip(self), fields(window = window.as_str()))]
    async fn fetch(&self, window: TimeWindow) -> Result<Value, QuaketilesError> {
        let url = self.feed_url(window);

        debug!("fetching feed from {}", url);

        let response = self.client.get(&url).send().await?;

        // Check status before parsing
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QuaketilesError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        let value: Value = serde_json::from_str(&body)?;

        debug!("fetched {} bytes", body.len());
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;

    use super::*;

    const HOUR_PATH: &str = "/earthquakes/feed/v1.0/summary/all_hour.geojson";
    const DAY_PATH: &str = "/earthquakes/feed/v1.0/summary/all_day.geojson";
    const WEEK_PATH: &str = "/earthquakes/feed/v1.0/summary/all_week.geojson";

    /// Serve `router` on an ephemeral port and return a client pointed at it.
    async fn local_client(router: Router) -> UsgsClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

        UsgsClient::with_config(&FeedConfig {
            base_url: format!("http://{addr}"),
            ..FeedConfig::default()
        })
        .unwrap()
    }

    fn feed_router() -> Router {
        Router::new()
            .route(
                HOUR_PATH,
                get(|| async {
                    r#"{"type":"FeatureCollection","features":[{"id":"nc1"}]}"#
                }),
            )
            .route(
                DAY_PATH,
                get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "feed offline") }),
            )
            .route(WEEK_PATH, get(|| async { "<html>not json</html>" }))
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let client = local_client(feed_router()).await;
        let body = client.fetch(TimeWindow::Hour).await.unwrap();
        assert_eq!(body["type"], "FeatureCollection");
        assert_eq!(body["features"][0]["id"], "nc1");
    }

    #[tokio::test]
    async fn test_fetch_maps_error_status() {
        let client = local_client(feed_router()).await;
        match client.fetch(TimeWindow::Day).await {
            Err(QuaketilesError::Api { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "feed offline");
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_maps_invalid_json() {
        let client = local_client(feed_router()).await;
        let err = client.fetch(TimeWindow::Week).await.unwrap_err();
        assert!(matches!(err, QuaketilesError::Parse(_)));
    }

    #[test]
    fn test_window_parse() {
        for window in TimeWindow::ALL {
            let parsed: TimeWindow = window.as_str().parse().unwrap();
            assert_eq!(parsed, window);
        }
        assert_eq!("WEEK".parse::<TimeWindow>().unwrap(), TimeWindow::Week);
        assert!("month".parse::<TimeWindow>().is_err());
    }

    #[test]
    fn test_default_window_is_day() {
        assert_eq!(TimeWindow::default(), TimeWindow::Day);
    }

    #[test]
    fn test_feed_url() {
        let client = UsgsClient::with_config(&FeedConfig {
            base_url: "http://localhost:9000/".into(),
            ..FeedConfig::default()
        })
        .unwrap();

        assert_eq!(
            client.feed_url(TimeWindow::Hour),
            "http://localhost:9000/earthquakes/feed/v1.0/summary/all_hour.geojson"
        );
    }
}
