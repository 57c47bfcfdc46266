//! Network tier
//!
//! Fetches image bytes with a plain HTTP GET. Only status 200 counts as a
//! hit; the body is returned untouched. Transport is behind [`HttpClient`] so
//! the status policy stays here while connection handling stays in the client.

use crate::config::NetworkConfig;
use crate::error::{StashError, StashResult};
use crate::tier::ImageSource;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Status and body of a completed HTTP exchange
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Minimal HTTP transport
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issue a GET and return whatever status the server answered with.
    ///
    /// Only connection-level failures are errors.
    async fn get(&self, url: &Url) -> StashResult<HttpResponse>;
}

/// [`HttpClient`] backed by a `ureq` agent on tokio's blocking pool
#[derive(Clone)]
pub struct UreqClient {
    agent: ureq::Agent,
    user_agent: String,
    max_body_bytes: u64,
}

impl UreqClient {
    pub fn new(config: &NetworkConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            user_agent: config.user_agent.clone(),
            max_body_bytes: config.max_body_bytes,
        }
    }
}

impl Default for UreqClient {
    fn default() -> Self {
        Self::new(&NetworkConfig::default())
    }
}

#[async_trait]
impl HttpClient for UreqClient {
    async fn get(&self, url: &Url) -> StashResult<HttpResponse> {
        let agent = self.agent.clone();
        let user_agent = self.user_agent.clone();
        let limit = self.max_body_bytes;
        let url = url.to_string();

        tokio::task::spawn_blocking(move || -> StashResult<HttpResponse> {
            let mut response = agent
                .get(url.as_str())
                .header("User-Agent", user_agent.as_str())
                .call()
                .map_err(StashError::transport)?;

            let status = response.status().as_u16();
            let body = response
                .body_mut()
                .with_config()
                .limit(limit)
                .read_to_vec()
                .map_err(StashError::transport)?;

            Ok(HttpResponse {
                status,
                body: Bytes::from(body),
            })
        })
        .await
        .map_err(StashError::transport)?
    }
}

/// Parse a source locator into an absolute http(s) URL
pub fn parse_locator(locator: &str) -> StashResult<Url> {
    let invalid = |reason: String| StashError::InvalidLocator {
        locator: locator.to_string(),
        reason,
    };

    let url = Url::parse(locator).map_err(|e| invalid(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme '{}'", other))),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }

    Ok(url)
}

/// Fetches image bytes over HTTP
#[derive(Clone)]
pub struct NetworkTier {
    client: Arc<dyn HttpClient>,
}

impl NetworkTier {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }

    /// Network tier using a `ureq` client built from `config`
    pub fn from_config(config: &NetworkConfig) -> Self {
        Self::new(Arc::new(UreqClient::new(config)))
    }
}

#[async_trait]
impl ImageSource for NetworkTier {
    async fn fetch_image(&self, locator: &str) -> StashResult<Bytes> {
        let url = parse_locator(locator)?;

        let response = self.client.get(&url).await?;
        if response.status != 200 {
            return Err(StashError::BadResponse {
                status: response.status,
            });
        }

        debug!("Fetched {} bytes from {}", response.body.len(), url);
        Ok(response.body)
    }
}
