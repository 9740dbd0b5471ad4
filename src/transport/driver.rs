//! Single-attempt execution of a resolved configuration.
//!
//! Steps:
//! 1. Open a client from the engine for this configuration.
//! 2. Dispatch the request and time it until status and headers arrive.
//! 3. Drain the body; the body is released on every path.

use std::time::{Duration, Instant};

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::Method;
use url::Url;

use super::{RawResponse, TransportEngine, TransportError, TransportRequest};
use crate::request::{HeaderList, ResolvedTransportConfig};

/// Content type injected for POST/PUT requests that set none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Outcome of a successful exchange.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub response: RawResponse,
    /// Dispatch until status and headers were received.
    pub elapsed: Duration,
}

/// Builds the transport request from descriptor fields.
///
/// Headers are applied in the caller's order and the lower-cased names form
/// the order hint. The default content type is appended after the hinted
/// headers.
pub fn build_request(
    method: &str,
    url: &str,
    headers: &HeaderList,
    body: Option<&str>,
) -> Result<TransportRequest, TransportError> {
    let method = Method::from_bytes(method.as_bytes())
        .map_err(|err| TransportError::RequestBuild(format!("invalid method '{method}': {err}")))?;
    let url = Url::parse(url)
        .map_err(|err| TransportError::RequestBuild(format!("invalid url '{url}': {err}")))?;

    let mut applied = Vec::with_capacity(headers.len() + 1);
    let mut header_order = Vec::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| TransportError::RequestBuild(format!("invalid header name '{name}'")))?;
        HeaderValue::from_str(value)
            .map_err(|_| TransportError::RequestBuild(format!("invalid value for header '{name}'")))?;
        applied.push((name.to_string(), value.to_string()));
        header_order.push(name.to_ascii_lowercase());
    }

    let needs_content_type = matches!(method, Method::POST | Method::PUT)
        && !headers.get("content-type").is_some_and(|value| !value.is_empty());
    if needs_content_type {
        applied.retain(|(name, _)| !name.eq_ignore_ascii_case("content-type"));
        applied.push(("Content-Type".to_string(), DEFAULT_CONTENT_TYPE.to_string()));
    }

    Ok(TransportRequest {
        method,
        url,
        headers: applied,
        header_order,
        body: body.map(|body| Bytes::copy_from_slice(body.as_bytes())),
    })
}

/// Runs exactly one exchange through `engine`. No retries.
pub async fn execute(
    engine: &dyn TransportEngine,
    config: &ResolvedTransportConfig,
    request: TransportRequest,
) -> Result<Exchange, TransportError> {
    let client = engine.open(config)?;

    log::debug!(
        "dispatching {} {} with {}",
        request.method,
        request.url,
        config.identity.label()
    );
    let started = Instant::now();
    let response = client.execute(request).await?;
    let elapsed = started.elapsed();
    log::debug!("received {} over {:?}", response.status, response.version);

    let body = response.body.drain().await.map_err(|err| match err {
        TransportError::BodyRead(message) => TransportError::BodyRead(message),
        other => TransportError::BodyRead(other.to_string()),
    })?;

    Ok(Exchange {
        response: RawResponse {
            status: response.status,
            version: response.version,
            headers: response.headers,
            cookies: response.cookies,
            body,
        },
        elapsed,
    })
}
