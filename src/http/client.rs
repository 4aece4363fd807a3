//! Rate-limited HTTP client
//!
//! Provides the generic client used for every external service:
//! - Credential attached to each request
//! - Pacing (fixed interval, sliding window or token bucket)
//! - Status classification into typed errors
//! - Response body parsing
//!
//! Requests from one client are serialized: the pacer lock is held from the
//! pacing wait until the response has been classified.

use super::rate_limit::{Pacer, PacingPolicy, PacingSnapshot};
use super::response::{extract_error_message, parse_retry_after, Payload, DEFAULT_ERROR_PATHS};
use crate::auth::Credential;
use crate::error::{Error, Result};
use crate::types::{JsonValue, Method, QueryParams, QueryValue, StringMap};
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL all request paths are resolved against
    pub base_url: String,
    /// Credential attached to every request
    pub credential: Credential,
    /// Request timeout
    pub timeout: Duration,
    /// Pacing policy
    pub pacing: PacingPolicy,
    /// Retry once after a 429 that carries `Retry-After`
    pub retry_on_429: bool,
    /// Longest `Retry-After` honored automatically
    pub max_retry_after: Duration,
    /// Default headers for all requests
    pub default_headers: StringMap,
    /// User agent string
    pub user_agent: String,
    /// JSON paths probed for an error message on failed responses
    pub error_paths: Vec<String>,
}

impl HttpClientConfig {
    /// Config with defaults for everything but the base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            credential: Credential::None,
            timeout: Duration::from_secs(30),
            pacing: PacingPolicy::default(),
            retry_on_429: true,
            max_retry_after: Duration::from_secs(60),
            default_headers: StringMap::new(),
            user_agent: format!("paced-client/{}", env!("CARGO_PKG_VERSION")),
            error_paths: DEFAULT_ERROR_PATHS.iter().map(|p| (*p).to_string()).collect(),
        }
    }

    /// Create a new config builder
    pub fn builder(base_url: impl Into<String>) -> HttpClientConfigBuilder {
        HttpClientConfigBuilder {
            config: Self::new(base_url),
        }
    }
}

/// Builder for HTTP client config
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the credential
    pub fn credential(mut self, credential: Credential) -> Self {
        self.config.credential = credential;
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the pacing policy
    pub fn pacing(mut self, pacing: PacingPolicy) -> Self {
        self.config.pacing = pacing;
        self
    }

    /// Disable pacing
    pub fn no_pacing(mut self) -> Self {
        self.config.pacing = PacingPolicy::Unlimited;
        self
    }

    /// Enable or disable the single automatic retry on 429
    pub fn retry_on_429(mut self, enabled: bool) -> Self {
        self.config.retry_on_429 = enabled;
        self
    }

    /// Cap the `Retry-After` delay the client will sleep through
    pub fn max_retry_after(mut self, max: Duration) -> Self {
        self.config.max_retry_after = max;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Replace the JSON paths probed for error messages
    pub fn error_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.error_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// Options for a single request
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Query parameters
    pub query: QueryParams,
    /// Request headers
    pub headers: StringMap,
    /// Request body (JSON)
    pub body: Option<JsonValue>,
    /// Override the network timeout for this request
    pub timeout: Option<Duration>,
    /// Overall budget covering pacing, any Retry-After sleep and the network
    pub deadline: Option<Duration>,
}

impl RequestOptions {
    /// Create new request options
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set JSON body
    #[must_use]
    pub fn json(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the body from any serializable value
    pub fn body<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Set timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the overall deadline
    #[must_use]
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// HTTP client bound to one service, with pacing and typed errors
pub struct RateLimitedClient {
    client: Client,
    base_url: Url,
    config: HttpClientConfig,
    pacer: Mutex<Pacer>,
}

impl RateLimitedClient {
    /// Create a client for `base_url` with default timeout and retry settings.
    ///
    /// No network I/O happens here.
    pub fn configure(
        base_url: impl Into<String>,
        credential: Credential,
        pacing: PacingPolicy,
    ) -> Result<Self> {
        Self::with_config(
            HttpClientConfig::builder(base_url)
                .credential(credential)
                .pacing(pacing)
                .build(),
        )
    }

    /// Create a client from a full configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let base_url = parse_base_url(&config.base_url)?;
        let pacer = Pacer::new(&config.pacing)?;

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            config,
            pacer: Mutex::new(pacer),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Current pacing state. Waits for any in-flight request to finish.
    pub async fn pacing_snapshot(&self) -> PacingSnapshot {
        self.pacer.lock().await.snapshot()
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Payload> {
        self.request(Method::GET, path, RequestOptions::default())
            .await
    }

    /// Make a GET request with options
    pub async fn get_with(&self, path: &str, options: RequestOptions) -> Result<Payload> {
        self.request(Method::GET, path, options).await
    }

    /// Make a POST request
    pub async fn post(&self, path: &str, body: JsonValue) -> Result<Payload> {
        self.request(Method::POST, path, RequestOptions::default().json(body))
            .await
    }

    /// Make a PUT request
    pub async fn put(&self, path: &str, body: JsonValue) -> Result<Payload> {
        self.request(Method::PUT, path, RequestOptions::default().json(body))
            .await
    }

    /// Make a PATCH request
    pub async fn patch(&self, path: &str, body: JsonValue) -> Result<Payload> {
        self.request(Method::PATCH, path, RequestOptions::default().json(body))
            .await
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<Payload> {
        self.request(Method::DELETE, path, RequestOptions::default())
            .await
    }

    /// Make a request and deserialize the JSON response
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<T> {
        self.request(method, path, options).await?.deserialize()
    }

    /// Issue one request, paced, with at most one automatic retry on 429
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Payload> {
        validate_body(method, &options)?;
        let url = self.build_url(path)?;
        let deadline = options.deadline.map(|d| Instant::now() + d);

        let mut pacer = match deadline {
            Some(at) => tokio::time::timeout_at(at, self.pacer.lock())
                .await
                .map_err(|_| Error::deadline("waiting for the client"))?,
            None => self.pacer.lock().await,
        };
        let mut retried = false;

        loop {
            pacer.acquire(deadline).await?;

            let started = Instant::now();
            let (status, headers, body) = self.send(method, &url, &options, deadline).await?;

            if status.is_success() {
                pacer.mark_success();
                debug!(
                    "{} {} -> {} in {:?}",
                    method,
                    url,
                    status.as_u16(),
                    started.elapsed()
                );
                return Ok(Payload::from_body(status, body));
            }

            let retry_after = if status == StatusCode::TOO_MANY_REQUESTS {
                parse_retry_after(&headers)
            } else {
                None
            };

            if status == StatusCode::TOO_MANY_REQUESTS && !retried {
                if let Some(delay) = self.auto_retry_delay(retry_after, deadline) {
                    warn!(
                        "Rate limited (429) on {} {}, retrying once in {:?}",
                        method, url, delay
                    );
                    tokio::time::sleep(delay).await;
                    retried = true;
                    continue;
                }
            }

            let message = extract_error_message(status, &body, &self.config.error_paths);
            debug!("{} {} -> {}: {}", method, url, status.as_u16(), message);
            return Err(Error::from_status(status.as_u16(), message, retry_after));
        }
    }

    async fn send(
        &self,
        method: Method,
        url: &Url,
        options: &RequestOptions,
        deadline: Option<Instant>,
    ) -> Result<(StatusCode, HeaderMap, Bytes)> {
        let mut timeout = options.timeout.unwrap_or(self.config.timeout);
        if let Some(at) = deadline {
            let remaining = at.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::deadline("waiting for the response"));
            }
            timeout = timeout.min(remaining);
        }

        let mut req = self
            .client
            .request(method.into(), url.clone())
            .timeout(timeout);

        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }
        for (key, value) in &options.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        let query: Vec<(&str, String)> = options
            .query
            .iter()
            .flat_map(|(key, value)| value.pairs(key))
            .collect();
        if !query.is_empty() {
            req = req.query(&query);
        }

        if let Some(ref body) = options.body {
            req = req.json(body);
        }

        req = self.config.credential.apply(req);

        let response = req.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok((status, headers, body))
    }

    /// Delay before the automatic 429 retry, if one is allowed
    fn auto_retry_delay(
        &self,
        retry_after: Option<Duration>,
        deadline: Option<Instant>,
    ) -> Option<Duration> {
        if !self.config.retry_on_429 {
            return None;
        }
        let delay = retry_after?;
        if delay > self.config.max_retry_after {
            debug!(
                "Retry-After {:?} exceeds the {:?} cap, not retrying",
                delay, self.config.max_retry_after
            );
            return None;
        }
        if let Some(at) = deadline {
            if Instant::now() + delay >= at {
                return None;
            }
        }
        Some(delay)
    }

    /// Resolve a relative path against the base URL
    fn build_url(&self, path: &str) -> Result<Url> {
        if path.contains("://") {
            return Err(Error::invalid_request(format!(
                "expected a path relative to {}, got '{path}'",
                self.base_url
            )));
        }

        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }
}

impl std::fmt::Debug for RateLimitedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitedClient")
            .field("base_url", &self.base_url.as_str())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    if raw.trim().is_empty() {
        return Err(Error::missing_field("base_url"));
    }
    let url = Url::parse(raw)?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(Error::invalid_value(
            "base_url",
            format!("'{raw}' is not an http(s) URL"),
        ));
    }
    Ok(url)
}

fn validate_body(method: Method, options: &RequestOptions) -> Result<()> {
    match (&options.body, method) {
        (Some(_), m) if !m.allows_body() => Err(Error::invalid_request(format!(
            "{m} requests cannot carry a body"
        ))),
        (None, m) if m.requires_body() => Err(Error::invalid_request(format!(
            "{m} requests require a JSON body"
        ))),
        _ => Ok(()),
    }
}
