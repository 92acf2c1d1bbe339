/// HTTP client for the order backend.
///
/// Talks to the backend's two endpoints using the synchronous `ureq` client:
///
/// - `GET /api/articles`: the menu, fetched once at startup.
/// - `POST /api/orders`: orders for a date containing any of the given item
///   descriptions, optionally only those strictly after a time of day.
///
/// The [`OrderFeed`] trait is the seam the application core depends on, so
/// the core can be exercised without a backend.
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::schema::BackendConfig;
use crate::error::FetchError;
use crate::model::{Article, Order};

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Body of `POST /api/orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrdersQuery {
    pub descrizioni: Vec<String>,
    /// `YYYY-MM-DD`.
    pub data: String,
    /// `HH:MM:SS`; only orders strictly after this time are returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ora: Option<String>,
}

/// Error body the backend sends with non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

// ---------------------------------------------------------------------------
// Feed abstraction
// ---------------------------------------------------------------------------

/// Source of articles and orders.
pub trait OrderFeed {
    fn articles(&self) -> Result<Vec<Article>, FetchError>;
    fn orders(&self, query: &OrdersQuery) -> Result<Vec<Order>, FetchError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// Synchronous HTTP feed.
#[derive(Debug, Clone)]
pub struct HttpOrderFeed {
    base_url: String,
    timeout: Duration,
}

impl HttpOrderFeed {
    /// Build a client from the resolved config.
    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(&config.url, Duration::from_millis(config.timeout_ms))
    }

    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            // "localhost" may resolve to ::1 first while the backend binds IPv4 only.
            base_url: base_url
                .trim_end_matches('/')
                .replace("://localhost", "://127.0.0.1"),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check whether the backend answers the articles endpoint.
    ///
    /// Uses a short timeout (3 s) regardless of the configured one.
    pub fn is_healthy(&self) -> bool {
        let url = format!("{}/api/articles", self.base_url);
        ureq::get(&url)
            .timeout(Duration::from_secs(3))
            .call()
            .is_ok()
    }
}

impl OrderFeed for HttpOrderFeed {
    fn articles(&self) -> Result<Vec<Article>, FetchError> {
        let url = format!("{}/api/articles", self.base_url);
        let resp = ureq::get(&url)
            .timeout(self.timeout)
            .call()
            .map_err(map_ureq_error)?;
        resp.into_json()
            .map_err(|e| FetchError::Decode(e.to_string()))
    }

    fn orders(&self, query: &OrdersQuery) -> Result<Vec<Order>, FetchError> {
        let url = format!("{}/api/orders", self.base_url);
        let resp = ureq::post(&url)
            .timeout(self.timeout)
            .send_json(query)
            .map_err(map_ureq_error)?;
        resp.into_json()
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

/// Translate a `ureq` failure, surfacing the backend's `{"error": ...}`
/// message when there is one.
fn map_ureq_error(err: ureq::Error) -> FetchError {
    match err {
        ureq::Error::Status(status, resp) => {
            let raw = resp.into_string().unwrap_or_default();
            FetchError::Server {
                status,
                message: server_message(&raw),
            }
        }
        ureq::Error::Transport(transport) => FetchError::Network(transport.to_string()),
    }
}

fn server_message(raw: &str) -> String {
    serde_json::from_str::<ErrorBody>(raw)
        .map(|body| body.error)
        .unwrap_or_else(|_| raw.trim().to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
