//! Credential types
//!
//! A credential is supplied by the caller at construction time, after any
//! config interpolation, and is attached unchanged to every request.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Location for API key placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Place in HTTP header
    #[default]
    Header,
    /// Place in query parameter
    Query,
}

/// Credential attached to outgoing requests
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credential {
    /// No authentication required
    #[default]
    None,

    /// Bearer token (`Authorization: Bearer <token>`)
    Bearer {
        /// The bearer token
        token: String,
    },

    /// API key authentication (header or query)
    ApiKey {
        /// The API key value
        value: String,
        /// Where to place the API key
        #[serde(default)]
        location: Location,
        /// Header name (for header location), defaults to `Authorization`
        #[serde(default)]
        header_name: Option<String>,
        /// Query parameter name (for query location), defaults to `api_key`
        #[serde(default)]
        query_param: Option<String>,
        /// Prefix to add before the value (e.g., "Token ")
        #[serde(default)]
        prefix: Option<String>,
    },

    /// HTTP Basic authentication
    Basic {
        /// Username
        username: String,
        /// Password
        #[serde(default)]
        password: String,
    },

    /// Fixed set of headers
    Headers {
        /// Headers to add to each request
        headers: BTreeMap<String, String>,
    },
}

impl Credential {
    /// Bearer token credential
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// API key sent in the given header
    pub fn api_key_header(header_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::ApiKey {
            value: value.into(),
            location: Location::Header,
            header_name: Some(header_name.into()),
            query_param: None,
            prefix: None,
        }
    }

    /// API key sent as a query parameter
    pub fn api_key_query(query_param: impl Into<String>, value: impl Into<String>) -> Self {
        Self::ApiKey {
            value: value.into(),
            location: Location::Query,
            header_name: None,
            query_param: Some(query_param.into()),
            prefix: None,
        }
    }

    /// Basic auth pair
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Short description safe for logs
    pub fn describe(&self) -> &'static str {
        match self {
            Credential::None => "none",
            Credential::Bearer { .. } => "bearer",
            Credential::ApiKey {
                location: Location::Header,
                ..
            } => "api_key (header)",
            Credential::ApiKey {
                location: Location::Query,
                ..
            } => "api_key (query)",
            Credential::Basic { .. } => "basic",
            Credential::Headers { .. } => "headers",
        }
    }
}

// Secrets never reach log output.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::None => f.write_str("None"),
            Credential::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("token", &"<redacted>")
                .finish(),
            Credential::ApiKey {
                location,
                header_name,
                query_param,
                prefix,
                ..
            } => f
                .debug_struct("ApiKey")
                .field("value", &"<redacted>")
                .field("location", location)
                .field("header_name", header_name)
                .field("query_param", query_param)
                .field("prefix", prefix)
                .finish(),
            Credential::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Credential::Headers { headers } => f
                .debug_struct("Headers")
                .field("names", &headers.keys().collect::<Vec<_>>())
                .finish(),
        }
    }
}
