//! Authentication module
//!
//! Supports: Bearer, API Key (header or query), Basic, fixed headers.
//!
//! Credentials are immutable once the client is built; nothing here
//! refreshes or rotates tokens.

mod authenticator;
mod types;

pub use types::{Credential, Location};
