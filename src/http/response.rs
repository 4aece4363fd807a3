//! Response bodies and status classification
//!
//! Successful bodies become a [`Payload`]; failed ones are reduced to a
//! human-readable message for the error taxonomy.

use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// JSON paths probed, in order, for an error message
pub const DEFAULT_ERROR_PATHS: &[&str] = &[
    "message",
    "error.message",
    "error_description",
    "error",
    "detail",
    "errors.0.message",
    "errors.0",
    "msg",
];

/// Longest raw body excerpt kept in an error message
const MAX_ERROR_TEXT: usize = 512;

/// Body of a successful response
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Parsed JSON (`{}` for 204 and empty bodies)
    Json(JsonValue),
    /// Non-JSON text body
    Text(String),
    /// Non-JSON, non-UTF-8 body
    Bytes(Bytes),
}

impl Payload {
    /// The empty JSON object returned for no-content responses
    pub fn empty() -> Self {
        Payload::Json(JsonValue::Object(JsonObject::new()))
    }

    /// Classify a successful body
    pub fn from_body(status: StatusCode, body: Bytes) -> Self {
        if status == StatusCode::NO_CONTENT || body.iter().all(u8::is_ascii_whitespace) {
            return Payload::empty();
        }
        if let Ok(value) = serde_json::from_slice::<JsonValue>(&body) {
            return Payload::Json(value);
        }
        match String::from_utf8(body.to_vec()) {
            Ok(text) => Payload::Text(text),
            Err(_) => Payload::Bytes(body),
        }
    }

    pub fn as_json(&self) -> Option<&JsonValue> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    /// JSON value, with text bodies wrapped as JSON strings
    pub fn into_json(self) -> JsonValue {
        match self {
            Payload::Json(value) => value,
            Payload::Text(text) => JsonValue::String(text),
            Payload::Bytes(bytes) => JsonValue::String(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Deserialize a JSON payload into `T`
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            Payload::Json(value) => serde_json::from_value(value)
                .map_err(|e| Error::decode(format!("unexpected JSON shape: {e}"))),
            Payload::Text(_) => Err(Error::decode("expected JSON, got a text body")),
            Payload::Bytes(_) => Err(Error::decode("expected JSON, got a binary body")),
        }
    }
}

/// Best-effort error message from a failed response body
pub fn extract_error_message<S: AsRef<str>>(status: StatusCode, body: &[u8], paths: &[S]) -> String {
    if let Ok(json) = serde_json::from_slice::<JsonValue>(body) {
        for path in paths {
            if let Some(message) = extract_path(&json, path.as_ref()) {
                return message;
            }
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string();
    }
    truncate(text, MAX_ERROR_TEXT)
}

/// Follow a dotted path (`error.message`, `errors.0`) to a non-empty string
/// or number
pub fn extract_path(value: &JsonValue, path: &str) -> Option<String> {
    let path = path.strip_prefix("$.").unwrap_or(path);

    let mut current = value;
    for part in path.split('.') {
        current = match current {
            JsonValue::Object(map) => map.get(part)?,
            JsonValue::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    match current {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a `Retry-After` header: delta-seconds (fractions allowed) or an
/// HTTP-date
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(secs) = raw.parse::<f64>() {
        return Duration::try_from_secs_f64(secs).ok();
    }

    let at = DateTime::parse_from_rfc2822(raw).ok()?.with_timezone(&Utc);
    Some((at - Utc::now()).to_std().unwrap_or(Duration::ZERO))
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
