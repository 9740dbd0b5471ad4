//! Normalized JSON response.

use std::collections::BTreeMap;

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transport::{RawCookie, RawResponse};

#[derive(Debug, Error)]
#[error("failed to serialize response: {0}")]
pub struct SerializationError(#[from] serde_json::Error);

/// Cookie received during the exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// RFC 3339 timestamp; absent when the cookie carried no expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
    pub http_only: bool,
    pub secure: bool,
}

impl From<RawCookie> for Cookie {
    fn from(cookie: RawCookie) -> Self {
        Self {
            name: cookie.name,
            value: cookie.value,
            domain: cookie.domain,
            path: cookie.path,
            expires: cookie
                .expires
                .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true)),
            http_only: cookie.http_only,
            secure: cookie.secure,
        }
    }
}

/// Single output document of the pipeline.
///
/// Exactly one of two shapes is produced: a success with `error` empty, or a
/// failure where only `error` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub cookies: Vec<Cookie>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    /// Milliseconds from dispatch until status and headers arrived.
    pub request_time: i64,
    pub content_type: String,
    /// Byte length of the raw body.
    pub size: usize,
}

impl NormalizedResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            ..Self::default()
        }
    }

    pub fn is_failure(&self) -> bool {
        !self.error.is_empty()
    }

    pub fn to_json(&self) -> Result<String, SerializationError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, SerializationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Shapes a completed exchange; the first value of each header wins.
pub fn normalize(raw: RawResponse, elapsed_ms: i64) -> NormalizedResponse {
    let headers: BTreeMap<String, String> = raw
        .headers
        .into_iter()
        .filter_map(|(name, values)| values.into_iter().next().map(|value| (name, value)))
        .collect();
    let content_type = headers.get("Content-Type").cloned().unwrap_or_default();

    NormalizedResponse {
        status_code: raw.status,
        body: String::from_utf8_lossy(&raw.body).into_owned(),
        size: raw.body.len(),
        cookies: raw.cookies.into_iter().map(Cookie::from).collect(),
        headers,
        error: String::new(),
        request_time: elapsed_ms,
        content_type,
    }
}

/// Output of the profile listing operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedProfiles {
    pub supported_profiles: Vec<String>,
}

impl SupportedProfiles {
    pub fn to_json(&self) -> Result<String, SerializationError> {
        Ok(serde_json::to_string(self)?)
    }
}
