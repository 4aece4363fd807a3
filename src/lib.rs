//! # paced-client
//!
//! A generic HTTP client for JSON APIs that paces its own traffic.
//!
//! Every client owns a base URL, a credential and a pacing policy. Requests
//! are admitted one at a time, spaced by a fixed interval or capped inside a
//! sliding window, and failures come back as typed errors.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use paced_client::{Credential, PacingPolicy, RateLimitedClient, Result};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = RateLimitedClient::configure(
//!         "https://api.example.com/v1",
//!         Credential::bearer("secret"),
//!         PacingPolicy::sliding_window(5, Duration::from_secs(1)),
//!     )?;
//!
//!     let widgets = client.get("widgets").await?;
//!     println!("{}", widgets.into_json());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      RateLimitedClient                          │
//! │  get() post() put() patch() delete() request() request_json()   │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌────────────┬─────────────────┼───────────────┬─────────────────┐
//! │   Pacer    │   Credential    │   Response    │   Service YAML  │
//! ├────────────┼─────────────────┼───────────────┼─────────────────┤
//! │ Fixed gap  │ Bearer          │ JSON / text   │ ${VAR} expansion│
//! │ Window     │ API key         │ Error mapping │ Pacing defs     │
//! │ Bucket     │ Basic / headers │ Retry-After   │ CLI             │
//! └────────────┴─────────────────┴───────────────┴─────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::needless_pass_by_value)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Credentials and how they attach to requests
pub mod auth;

/// Paced HTTP client, pacing policies and response handling
pub mod http;

/// `${VAR}` interpolation
pub mod template;

/// Service definitions loaded from YAML
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, ErrorKind, Result};
pub use types::*;

pub use auth::Credential;
pub use config::{load_service, ServiceConfig};
pub use http::{HttpClientConfig, PacingPolicy, Payload, RateLimitedClient, RequestOptions};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
