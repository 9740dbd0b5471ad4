//! Transport engine abstraction.
//!
//! The pipeline only talks to these traits: an engine is opened once per
//! resolved configuration and the resulting client performs a single
//! exchange. `ReqwestEngine` is the shipped implementation; tests substitute
//! their own.

pub mod driver;
pub mod reqwest_engine;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::{Method, Version};
use thiserror::Error;
use url::Url;

use crate::request::ResolvedTransportConfig;

pub use driver::{DEFAULT_CONTENT_TYPE, Exchange, build_request, execute};
pub use reqwest_engine::ReqwestEngine;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to create client: {0}")]
    ClientBuild(String),
    #[error("failed to create request: {0}")]
    RequestBuild(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("failed to read response body: {0}")]
    BodyRead(String),
}

/// Response headers keyed by canonical name, every received value kept.
pub type RawHeaders = BTreeMap<String, Vec<String>>;

/// Fully built request handed to a transport client.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    /// Headers in application order.
    pub headers: Vec<(String, String)>,
    /// Lower-cased names the engine should emit first, in this order.
    pub header_order: Vec<String>,
    pub body: Option<Bytes>,
}

/// Cookie as reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// `None` when the cookie carried no expiry.
    pub expires: Option<DateTime<Utc>>,
    pub http_only: bool,
    pub secure: bool,
}

/// Streaming response body.
///
/// `drain` consumes the body: whatever the outcome, the underlying stream is
/// released when it returns.
#[async_trait]
pub trait ResponseBody: Send {
    async fn drain(self: Box<Self>) -> Result<Bytes, TransportError>;
}

/// Body that is already in memory.
#[derive(Debug, Clone, Default)]
pub struct BufferedBody(pub Bytes);

#[async_trait]
impl ResponseBody for BufferedBody {
    async fn drain(self: Box<Self>) -> Result<Bytes, TransportError> {
        Ok(self.0)
    }
}

/// Status and headers received; the body is still pending.
pub struct EngineResponse {
    pub status: u16,
    /// Protocol the exchange was negotiated with.
    pub version: Version,
    pub headers: RawHeaders,
    pub cookies: Vec<RawCookie>,
    pub body: Box<dyn ResponseBody>,
}

impl fmt::Debug for EngineResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineResponse")
            .field("status", &self.status)
            .field("version", &self.version)
            .field("headers", &self.headers)
            .field("cookies", &self.cookies)
            .finish_non_exhaustive()
    }
}

/// Completed exchange with the body fully read.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    pub version: Version,
    pub headers: RawHeaders,
    pub cookies: Vec<RawCookie>,
    pub body: Bytes,
}

/// One-shot client produced by an engine for a single configuration.
#[async_trait]
pub trait TransportClient: Send + Sync {
    async fn execute(&self, request: TransportRequest) -> Result<EngineResponse, TransportError>;
}

/// Builds clients that reproduce a resolved fingerprint.
pub trait TransportEngine: Send + Sync {
    fn open(
        &self,
        config: &ResolvedTransportConfig,
    ) -> Result<Box<dyn TransportClient>, TransportError>;
}

/// MIME canonical form of a header name (`content-type` → `Content-Type`).
pub fn canonical_header_name(name: &str) -> String {
    let mut canonical = String::with_capacity(name.len());
    let mut upper = true;
    for ch in name.chars() {
        if upper {
            canonical.push(ch.to_ascii_uppercase());
        } else {
            canonical.push(ch.to_ascii_lowercase());
        }
        upper = ch == '-';
    }
    canonical
}
