//! Overpass API client.
//!
//! This module is only available when the `download` feature is enabled.
//!
//! Queries request every way matching the network filter inside the box,
//! plus (via the `>` recursion) all nodes those ways reference:
//!
//! ```text
//! [out:json][timeout:180];(way["highway"]...(45.0,7.0,45.1,7.1);>;);out;
//! ```

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::bbox::BoundingBox;
use crate::error::{Result, RoadnetError};
use crate::network::NetworkType;
use crate::osm::OsmResponse;
use crate::source::OsmSource;

/// Default public Overpass endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

/// Default server-side and client-side timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 180;

/// Configuration for talking to an Overpass server.
#[derive(Debug, Clone)]
pub struct OverpassConfig {
    /// Interpreter URL.
    pub endpoint: String,
    /// Query timeout in seconds, sent to the server and used for the request.
    pub timeout_secs: u64,
    /// Retries when the server is busy (HTTP 429 or 504).
    pub max_retries: u32,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: 2,
        }
    }
}

impl OverpassConfig {
    /// Use a different interpreter endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the query timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set the maximum number of retries on busy responses.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Build the Overpass QL query for a network inside a bounding box.
pub fn build_query(bbox: &BoundingBox, network: NetworkType, timeout_secs: u64) -> String {
    format!(
        "[out:json][timeout:{}];(way{}({});>;);out;",
        timeout_secs,
        network.to_overpass(),
        bbox.to_overpass()
    )
}

/// Fetches street data from an Overpass server.
#[derive(Debug, Clone, Default)]
pub struct OverpassSource {
    config: OverpassConfig,
}

impl OverpassSource {
    /// Create a source with the given configuration.
    pub fn new(config: OverpassConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &OverpassConfig {
        &self.config
    }

    /// Build the HTTP client.
    ///
    /// The blocking client runs its own runtime internally, so it is created
    /// on the calling thread for each fetch rather than held across threads.
    fn client(&self) -> Result<Client> {
        Ok(Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .user_agent(concat!("roadnet/", env!("CARGO_PKG_VERSION")))
            .build()?)
    }

    fn post_query(&self, client: &Client, query: &str) -> Result<OsmResponse> {
        let mut attempt = 0;
        loop {
            let response = client
                .post(&self.config.endpoint)
                .form(&[("data", query)])
                .send()?;
            let status = response.status();

            if is_busy(status) && attempt < self.config.max_retries {
                attempt += 1;
                tracing::warn!(
                    status = status.as_u16(),
                    attempt,
                    "Overpass server busy, retrying"
                );
                std::thread::sleep(Duration::from_secs(2 * attempt as u64));
                continue;
            }

            if !status.is_success() {
                let reason = response
                    .text()
                    .ok()
                    .and_then(|body| error_remark(&body))
                    .unwrap_or_else(|| {
                        status.canonical_reason().unwrap_or("unknown").to_string()
                    });
                return Err(RoadnetError::Overpass {
                    status: status.as_u16(),
                    reason,
                });
            }

            let body = response.text()?;
            return OsmResponse::from_json(&body);
        }
    }
}

impl OsmSource for OverpassSource {
    fn fetch(&self, bbox: &BoundingBox, network: NetworkType) -> Result<OsmResponse> {
        let query = build_query(bbox, network, self.config.timeout_secs);
        tracing::debug!(endpoint = %self.config.endpoint, query = %query, "Querying Overpass");

        let client = self.client()?;
        let response = self.post_query(&client, &query)?;

        tracing::debug!(elements = response.elements.len(), "Overpass response received");
        Ok(response)
    }

    fn describe(&self) -> String {
        format!("overpass {}", self.config.endpoint)
    }
}

fn is_busy(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::GATEWAY_TIMEOUT
}

/// Pull the human-readable error out of an Overpass HTML error page.
fn error_remark(body: &str) -> Option<String> {
    let start = body.find("<strong")?;
    let rest = &body[start..];
    let close = rest.find("</strong>")?;
    let after = rest[close + "</strong>".len()..].trim_start();
    let message = after
        .split('<')
        .next()
        .unwrap_or("")
        .trim_start_matches(':')
        .trim();
    if message.is_empty() {
        None
    } else {
        Some(message.to_string())
    }
}
