//! Reqwest-based implementation of the `TransportEngine` trait.
//!
//! Reqwest cannot replay an arbitrary ClientHello, so the TLS identity is
//! approximated: the HTTP/2 SETTINGS and windows are applied exactly, the
//! custom fingerprint's version floor and ALPN choice are honoured, and the
//! rest of the identity is logged for diagnostics.

use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder, Proxy, redirect::Policy};

use super::{
    EngineResponse, RawCookie, RawHeaders, ResponseBody, TransportClient, TransportEngine,
    TransportError, TransportRequest, canonical_header_name,
};
use crate::fingerprint::{H2Config, H2SettingId, SpecFactory};
use crate::request::ResolvedTransportConfig;

const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Opens a fresh `reqwest::Client` per resolved configuration.
#[derive(Debug, Clone)]
pub struct ReqwestEngine {
    max_redirects: usize,
}

impl ReqwestEngine {
    pub fn new() -> Self {
        Self {
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }

    /// Redirect hop limit applied when redirects are followed.
    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn max_redirects(&self) -> usize {
        self.max_redirects
    }
}

impl Default for ReqwestEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportEngine for ReqwestEngine {
    fn open(
        &self,
        config: &ResolvedTransportConfig,
    ) -> Result<Box<dyn TransportClient>, TransportError> {
        let redirect = if config.follow_redirects {
            Policy::limited(self.max_redirects)
        } else {
            Policy::none()
        };

        let mut builder = Client::builder()
            .timeout(config.timeout)
            .redirect(redirect)
            .danger_accept_invalid_certs(config.insecure_skip_tls)
            .cookie_provider(config.cookie_store.jar());

        if let Some(proxy) = &config.proxy {
            let proxy = Proxy::all(proxy.as_str())
                .map_err(|err| TransportError::ClientBuild(format!("invalid proxy: {err}")))?;
            builder = builder.proxy(proxy);
        }

        builder = apply_h2(builder, &config.h2);

        if let Some(factory) = config.identity.spec_factory() {
            builder = apply_custom_hello(builder, factory);
        }

        log::debug!(
            "opening reqwest client for {} (randomized extension order: {})",
            config.identity.label(),
            config.randomize_extension_order
        );

        let client = builder
            .build()
            .map_err(|err| TransportError::ClientBuild(err.to_string()))?;

        Ok(Box::new(ReqwestTransportClient { client }))
    }
}

fn apply_h2(mut builder: ClientBuilder, h2: &H2Config) -> ClientBuilder {
    if let Some(window) = checked_setting(h2, H2SettingId::InitialWindowSize) {
        builder = builder.http2_initial_stream_window_size(window);
    }
    if let Some(frame) = checked_setting(h2, H2SettingId::MaxFrameSize) {
        builder = builder.http2_max_frame_size(frame);
    }
    if let Some(list) = checked_setting(h2, H2SettingId::MaxHeaderListSize) {
        builder = builder.http2_max_header_list_size(list);
    }
    builder.http2_initial_connection_window_size(h2.connection_window())
}

// h2 asserts on out-of-range values, so those are skipped rather than applied.
fn checked_setting(h2: &H2Config, id: H2SettingId) -> Option<u32> {
    let value = h2.settings.get(id)?;
    match id.check(value) {
        Ok(()) => Some(value),
        Err(message) => {
            log::warn!("{message}; leaving it at the engine default");
            None
        }
    }
}

fn apply_custom_hello(mut builder: ClientBuilder, factory: &SpecFactory) -> ClientBuilder {
    let hello = factory.client_hello_spec();
    if let Some(version) = min_tls_version(hello.tls_version_min) {
        builder = builder.min_tls_version(version);
    }
    if !factory.offers_h2() {
        builder = builder.http1_only();
    }
    log::trace!(
        "custom hello: {} cipher suites, extensions {:?}",
        hello.cipher_suites.len(),
        hello.extension_ids()
    );
    builder
}

// native-tls has no TLS 1.3 floor; that case is left to negotiation.
fn min_tls_version(code: u16) -> Option<reqwest::tls::Version> {
    match code {
        0x0301 => Some(reqwest::tls::Version::TLS_1_0),
        0x0302 => Some(reqwest::tls::Version::TLS_1_1),
        0x0303 => Some(reqwest::tls::Version::TLS_1_2),
        _ => None,
    }
}

struct ReqwestTransportClient {
    client: Client,
}

#[async_trait]
impl TransportClient for ReqwestTransportClient {
    async fn execute(&self, request: TransportRequest) -> Result<EngineResponse, TransportError> {
        let headers = convert_headers(&request.headers)?;
        log::trace!("header order hint: {:?}", request.header_order);

        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(headers);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| TransportError::Request(err.to_string()))?;

        let status = response.status().as_u16();
        let version = response.version();
        let headers = collect_headers(response.headers());
        let cookies = response.cookies().map(convert_cookie).collect();

        Ok(EngineResponse {
            status,
            version,
            headers,
            cookies,
            body: Box::new(ReqwestBody { response }),
        })
    }
}

struct ReqwestBody {
    response: reqwest::Response,
}

#[async_trait]
impl ResponseBody for ReqwestBody {
    async fn drain(self: Box<Self>) -> Result<Bytes, TransportError> {
        self.response
            .bytes()
            .await
            .map_err(|err| TransportError::BodyRead(err.to_string()))
    }
}

fn convert_headers(headers: &[(String, String)]) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| TransportError::RequestBuild(err.to_string()))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|err| TransportError::RequestBuild(err.to_string()))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

fn collect_headers(map: &HeaderMap) -> RawHeaders {
    let mut headers = RawHeaders::new();
    for (name, value) in map.iter() {
        headers
            .entry(canonical_header_name(name.as_str()))
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    headers
}

fn convert_cookie(cookie: reqwest::cookie::Cookie<'_>) -> RawCookie {
    RawCookie {
        name: cookie.name().to_string(),
        value: cookie.value().to_string(),
        domain: cookie.domain().unwrap_or_default().to_string(),
        path: cookie.path().unwrap_or_default().to_string(),
        expires: cookie.expires().map(to_utc),
        http_only: cookie.http_only(),
        secure: cookie.secure(),
    }
}

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::FingerprintResolver;
    use crate::request::{RequestDescriptor, assemble};

    fn config_for(descriptor: &RequestDescriptor) -> ResolvedTransportConfig {
        let (identity, h2) = FingerprintResolver::default().resolve(descriptor).unwrap();
        assemble(descriptor, identity, h2)
    }

    #[test]
    fn opens_client_for_named_profile() {
        let config = config_for(&RequestDescriptor::new("https://example.com"));
        assert!(ReqwestEngine::new().open(&config).is_ok());
    }

    #[test]
    fn opens_client_for_custom_fingerprint() {
        let descriptor = RequestDescriptor::new("https://example.com")
            .with_ja3("771,4865-4866-49195,0-10-11-16,29-23,0");
        let mut config = config_for(&descriptor);
        config.follow_redirects = false;
        assert!(ReqwestEngine::new().open(&config).is_ok());
    }

    #[test]
    fn invalid_proxy_fails_client_construction() {
        let descriptor = RequestDescriptor::new("https://example.com").with_proxy("http://bad host:80");
        let result = ReqwestEngine::new().open(&config_for(&descriptor));
        assert!(matches!(result, Err(TransportError::ClientBuild(_))));
    }

    #[test]
    fn response_headers_are_canonicalized_and_grouped() {
        let mut map = HeaderMap::new();
        map.append("content-type", HeaderValue::from_static("text/html"));
        map.append("set-cookie", HeaderValue::from_static("a=1"));
        map.append("set-cookie", HeaderValue::from_static("b=2"));

        let headers = collect_headers(&map);
        assert_eq!(headers["Content-Type"], vec!["text/html"]);
        assert_eq!(headers["Set-Cookie"], vec!["a=1", "b=2"]);
    }

    #[test]
    fn out_of_range_h2_settings_are_not_applied() {
        let mut config = config_for(&RequestDescriptor::new("https://example.com"));
        config.h2.settings.table.insert(H2SettingId::MaxFrameSize, 1_000);
        config.h2.settings.table.insert(H2SettingId::InitialWindowSize, u32::MAX);
        config.h2.connection_flow = u32::MAX;

        assert_eq!(checked_setting(&config.h2, H2SettingId::MaxFrameSize), None);
        assert_eq!(checked_setting(&config.h2, H2SettingId::InitialWindowSize), None);
        assert_eq!(
            checked_setting(&config.h2, H2SettingId::MaxHeaderListSize),
            Some(262_144)
        );
        assert!(ReqwestEngine::new().open(&config).is_ok());
    }

    #[test]
    fn tls_floor_maps_only_pre_1_3_versions() {
        assert!(min_tls_version(0x0303).is_some());
        assert!(min_tls_version(0x0304).is_none());
    }
}
