//! HTTP client module
//!
//! Provides the rate-limited client every external service goes through.
//!
//! # Features
//!
//! - **Pacing**: fixed interval, sliding window, or governor token bucket
//! - **Typed errors**: 401/403, 404, 429 and other statuses map to distinct variants
//! - **429 handling**: one automatic retry honoring `Retry-After`
//! - **Caller backoff**: constant, linear, and exponential retry schedules

mod backoff;
mod client;
mod rate_limit;
mod response;

pub use backoff::Backoff;
pub use client::{HttpClientConfig, HttpClientConfigBuilder, RateLimitedClient, RequestOptions};
pub use rate_limit::{
    Pacer, PacingPolicy, PacingSnapshot, RateLimiter, RateLimiterConfig, RateWindow,
};
pub use response::{
    extract_error_message, extract_path, parse_retry_after, Payload, DEFAULT_ERROR_PATHS,
};

#[cfg(test)]
mod tests;
