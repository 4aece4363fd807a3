//! Service definitions
//!
//! A service is described once in YAML (base URL, credential, pacing and
//! HTTP settings) and turned into a [`RateLimitedClient`]. String values
//! are interpolated from the environment before deserialization.

use crate::auth::Credential;
use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, PacingPolicy, RateLimitedClient, RateLimiterConfig};
use crate::template;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

// ============================================================================
// Top-Level Service Config
// ============================================================================

/// Complete service definition loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name, used in logs
    #[serde(default)]
    pub name: Option<String>,

    /// Base URL for API requests
    pub base_url: String,

    /// Credential attached to every request
    #[serde(default)]
    pub credential: Credential,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpSettings,
}

// ============================================================================
// HTTP Settings
// ============================================================================

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,

    /// Retry once on 429 when `Retry-After` is present
    #[serde(default = "default_true")]
    pub retry_on_429: bool,

    /// Longest `Retry-After` honored automatically, in seconds
    #[serde(default = "default_max_retry_after_secs")]
    pub max_retry_after_secs: f64,

    /// Custom user agent
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Headers added to every request
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// JSON paths probed for error messages (defaults apply when absent)
    #[serde(default)]
    pub error_message_paths: Option<Vec<String>>,

    /// Pacing policy
    #[serde(default)]
    pub pacing: PacingDef,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retry_on_429: true,
            max_retry_after_secs: default_max_retry_after_secs(),
            user_agent: None,
            headers: HashMap::new(),
            error_message_paths: None,
            pacing: PacingDef::default(),
        }
    }
}

fn default_timeout_secs() -> f64 {
    30.0
}

fn default_max_retry_after_secs() -> f64 {
    60.0
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Pacing
// ============================================================================

/// Pacing policy as written in YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PacingDef {
    /// No pacing
    None,
    /// Minimum delay between consecutive requests
    FixedInterval { interval_secs: f64 },
    /// At most `max_requests` per `per_seconds`
    SlidingWindow { max_requests: u32, per_seconds: f64 },
    /// Token bucket
    TokenBucket {
        requests_per_second: u32,
        #[serde(default)]
        burst_size: Option<u32>,
    },
}

impl Default for PacingDef {
    fn default() -> Self {
        Self::FixedInterval { interval_secs: 0.1 }
    }
}

impl PacingDef {
    /// Convert to a runtime pacing policy
    pub fn to_policy(&self) -> Result<PacingPolicy> {
        let policy = match self {
            PacingDef::None => PacingPolicy::Unlimited,
            PacingDef::FixedInterval { interval_secs } => {
                PacingPolicy::FixedInterval(seconds("http.pacing.interval_secs", *interval_secs)?)
            }
            PacingDef::SlidingWindow {
                max_requests,
                per_seconds,
            } => PacingPolicy::SlidingWindow {
                max_requests: *max_requests,
                per: seconds("http.pacing.per_seconds", *per_seconds)?,
            },
            PacingDef::TokenBucket {
                requests_per_second,
                burst_size,
            } => PacingPolicy::TokenBucket(RateLimiterConfig::new(
                *requests_per_second,
                burst_size.unwrap_or(*requests_per_second),
            )),
        };
        policy.validate()?;
        Ok(policy)
    }
}

fn seconds(field: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        Error::invalid_value(
            field,
            format!("expected a non-negative number of seconds, got {value}"),
        )
    })
}

// ============================================================================
// Loading
// ============================================================================

impl ServiceConfig {
    /// Parse a service definition, interpolating `${VAR}` from the environment
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Self::from_yaml_str_with(yaml, &template::env_lookup)
    }

    /// Parse a service definition with a custom variable lookup
    pub fn from_yaml_str_with<F>(yaml: &str, lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: serde_json::Value = serde_yaml::from_str(yaml)?;
        if !raw.is_object() {
            return Err(Error::config("service definition must be a YAML mapping"));
        }
        if raw.get("base_url").is_none() {
            return Err(Error::missing_field("base_url"));
        }

        let rendered = template::render_value(&raw, lookup)?;
        Ok(serde_json::from_value(rendered)?)
    }

    /// Load a service definition from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&yaml)?;
        debug!(
            "Loaded service '{}' from {}",
            config.display_name(),
            path.display()
        );
        Ok(config)
    }

    /// Name for logs, falling back to the base URL
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.base_url)
    }

    /// Runtime client configuration
    pub fn to_http_config(&self) -> Result<HttpClientConfig> {
        let http = &self.http;
        let mut builder = HttpClientConfig::builder(self.base_url.clone())
            .credential(self.credential.clone())
            .timeout(seconds("http.timeout_secs", http.timeout_secs)?)
            .pacing(http.pacing.to_policy()?)
            .retry_on_429(http.retry_on_429)
            .max_retry_after(seconds(
                "http.max_retry_after_secs",
                http.max_retry_after_secs,
            )?);

        if let Some(agent) = &http.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        for (key, value) in &http.headers {
            builder = builder.header(key.clone(), value.clone());
        }
        if let Some(paths) = &http.error_message_paths {
            builder = builder.error_paths(paths.iter().cloned());
        }

        Ok(builder.build())
    }

    /// Build the client for this service
    pub fn build_client(&self) -> Result<RateLimitedClient> {
        RateLimitedClient::with_config(self.to_http_config()?)
    }
}

/// Load a service definition from a YAML file
pub fn load_service(path: impl AsRef<Path>) -> Result<ServiceConfig> {
    ServiceConfig::load(path)
}
