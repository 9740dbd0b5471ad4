//! High level client orchestration.
//!
//! Wires the fingerprint resolver, request assembler, execution driver and
//! response normalizer into a single pipeline: one descriptor in, one
//! normalized response out.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::config::{ConfigError, load_descriptor};
use crate::fingerprint::{FingerprintResolver, ProfileRegistry, profiles::DEFAULT_PROFILE};
use crate::modules::events::{
    ClientEvent, EventDispatcher, EventHandler, FailureEvent, LoggingHandler, PostResponseEvent,
    PreRequestEvent,
};
use crate::request::{
    DEFAULT_TIMEOUT_SECS, HeaderList, RequestDescriptor, ResolvedTransportConfig, assemble,
};
use crate::response::{NormalizedResponse, SupportedProfiles, normalize};
use crate::transport::{ReqwestEngine, TransportEngine, TransportError, build_request, execute};

/// Result alias used across the orchestration layer.
pub type TlsClientResult<T> = Result<T, PipelineError>;

/// Any failure between descriptor intake and a drained response.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Payload for the convenience verbs.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Text(String),
    Json(serde_json::Value),
}

impl RequestBody {
    fn into_string(self) -> String {
        match self {
            RequestBody::Text(text) => text,
            RequestBody::Json(value) => value.to_string(),
        }
    }
}

impl From<String> for RequestBody {
    fn from(value: String) -> Self {
        RequestBody::Text(value)
    }
}

impl From<&str> for RequestBody {
    fn from(value: &str) -> Self {
        RequestBody::Text(value.to_string())
    }
}

impl From<serde_json::Value> for RequestBody {
    fn from(value: serde_json::Value) -> Self {
        RequestBody::Json(value)
    }
}

/// Client-wide defaults, applied where a descriptor leaves a field unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsClientConfig {
    pub default_profile: String,
    /// Seconds.
    pub default_timeout: u64,
    pub default_proxy: Option<String>,
    /// Used by the convenience verbs.
    pub follow_redirects: bool,
    /// Used by the convenience verbs.
    pub insecure_skip_tls: bool,
    pub enable_logging_events: bool,
}

impl Default for TlsClientConfig {
    fn default() -> Self {
        Self {
            default_profile: DEFAULT_PROFILE.to_string(),
            default_timeout: DEFAULT_TIMEOUT_SECS,
            default_proxy: None,
            follow_redirects: true,
            insecure_skip_tls: false,
            enable_logging_events: true,
        }
    }
}

/// Fluent builder for [`TlsClient`].
pub struct TlsClientBuilder {
    config: TlsClientConfig,
    registry: Option<Arc<ProfileRegistry>>,
    engine: Option<Arc<dyn TransportEngine>>,
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl TlsClientBuilder {
    pub fn new() -> Self {
        Self {
            config: TlsClientConfig::default(),
            registry: None,
            engine: None,
            handlers: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: TlsClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_default_profile(mut self, profile: impl Into<String>) -> Self {
        self.config.default_profile = profile.into();
        self
    }

    pub fn with_default_timeout(mut self, seconds: u64) -> Self {
        self.config.default_timeout = seconds.max(1);
        self
    }

    pub fn with_default_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config.default_proxy = Some(proxy.into());
        self
    }

    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = follow;
        self
    }

    pub fn with_insecure_skip_tls(mut self, skip: bool) -> Self {
        self.config.insecure_skip_tls = skip;
        self
    }

    pub fn with_registry(mut self, registry: Arc<ProfileRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_engine(mut self, engine: Arc<dyn TransportEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn disable_logging_events(mut self) -> Self {
        self.config.enable_logging_events = false;
        self
    }

    /// Fails when the default profile is not in the registry.
    pub fn build(self) -> TlsClientResult<TlsClient> {
        let registry = self.registry.unwrap_or_else(ProfileRegistry::builtin);
        if !registry.contains(&self.config.default_profile) {
            return Err(ConfigError::UnknownProfile(self.config.default_profile).into());
        }

        let mut events = EventDispatcher::new();
        if self.config.enable_logging_events {
            events.register_handler(Arc::new(LoggingHandler));
        }
        for handler in self.handlers {
            events.register_handler(handler);
        }

        let resolver =
            FingerprintResolver::new(registry).with_default_profile(&self.config.default_profile);
        let engine = self
            .engine
            .unwrap_or_else(|| Arc::new(ReqwestEngine::new()));

        Ok(TlsClient {
            config: self.config,
            resolver,
            engine,
            events,
        })
    }
}

impl Default for TlsClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Fingerprinted HTTP client.
///
/// Holds no per-request state: every call resolves its own configuration and
/// cookie store, so one client can serve concurrent requests.
pub struct TlsClient {
    config: TlsClientConfig,
    resolver: FingerprintResolver,
    engine: Arc<dyn TransportEngine>,
    events: EventDispatcher,
}

impl TlsClient {
    pub fn new() -> TlsClientResult<Self> {
        Self::builder().build()
    }

    pub fn builder() -> TlsClientBuilder {
        TlsClientBuilder::new()
    }

    pub fn config(&self) -> &TlsClientConfig {
        &self.config
    }

    /// Runs the pipeline; failures are reported in the `error` field.
    pub async fn request(&self, descriptor: RequestDescriptor) -> NormalizedResponse {
        match self.try_request(descriptor).await {
            Ok(response) => response,
            Err(err) => NormalizedResponse::failure(err.to_string()),
        }
    }

    /// Runs the pipeline and surfaces failures as errors.
    pub async fn try_request(
        &self,
        descriptor: RequestDescriptor,
    ) -> TlsClientResult<NormalizedResponse> {
        let url = descriptor.url.clone();
        let result = self.run(descriptor).await;
        if let Err(err) = &result {
            self.events.dispatch(ClientEvent::Failure(FailureEvent {
                url,
                error: err.to_string(),
                timestamp: Utc::now(),
            }));
        }
        result
    }

    /// Validation, resolution and assembly; performs no I/O.
    pub fn resolve(&self, descriptor: &RequestDescriptor) -> TlsClientResult<ResolvedTransportConfig> {
        if descriptor.url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl.into());
        }
        let (identity, h2) = self.resolver.resolve(descriptor)?;
        Ok(assemble(descriptor, identity, h2))
    }

    pub async fn get(&self, url: &str, headers: HeaderList) -> NormalizedResponse {
        self.request(self.descriptor_for("GET", url, headers, None))
            .await
    }

    pub async fn post(
        &self,
        url: &str,
        body: impl Into<RequestBody>,
        headers: HeaderList,
    ) -> NormalizedResponse {
        self.request(self.descriptor_for("POST", url, headers, Some(body.into())))
            .await
    }

    pub async fn put(
        &self,
        url: &str,
        body: impl Into<RequestBody>,
        headers: HeaderList,
    ) -> NormalizedResponse {
        self.request(self.descriptor_for("PUT", url, headers, Some(body.into())))
            .await
    }

    pub async fn delete(&self, url: &str, headers: HeaderList) -> NormalizedResponse {
        self.request(self.descriptor_for("DELETE", url, headers, None))
            .await
    }

    /// Replaces any fingerprint on `descriptor` with one built from `ja3` alone.
    pub async fn request_with_ja3(
        &self,
        descriptor: RequestDescriptor,
        ja3: &str,
    ) -> NormalizedResponse {
        self.request(descriptor.with_ja3(ja3)).await
    }

    /// Loads a JSON descriptor from disk and runs it.
    pub async fn request_from_file(&self, path: impl AsRef<Path>) -> NormalizedResponse {
        let path = path.as_ref();
        match load_descriptor(path) {
            Ok(descriptor) => self.request(descriptor).await,
            Err(err) => {
                self.events.dispatch(ClientEvent::Failure(FailureEvent {
                    url: path.display().to_string(),
                    error: err.to_string(),
                    timestamp: Utc::now(),
                }));
                NormalizedResponse::failure(err.to_string())
            }
        }
    }

    pub fn supported_profiles(&self) -> SupportedProfiles {
        SupportedProfiles {
            supported_profiles: self.resolver.registry().list_names(),
        }
    }

    async fn run(&self, descriptor: RequestDescriptor) -> TlsClientResult<NormalizedResponse> {
        let descriptor = self.apply_defaults(descriptor);
        let config = self.resolve(&descriptor)?;
        let request = build_request(
            &descriptor.method,
            &descriptor.url,
            &descriptor.headers,
            descriptor.body.as_deref(),
        )?;

        self.events.dispatch(ClientEvent::PreRequest(PreRequestEvent {
            url: descriptor.url.clone(),
            method: request.method.clone(),
            identity: config.identity.label(),
            timestamp: Utc::now(),
        }));
        let method = request.method.clone();

        let exchange = execute(self.engine.as_ref(), &config, request).await?;

        self.events.dispatch(ClientEvent::PostResponse(PostResponseEvent {
            url: descriptor.url,
            method,
            status: exchange.response.status,
            latency: exchange.elapsed,
            size: exchange.response.body.len(),
            timestamp: Utc::now(),
        }));

        let elapsed_ms = i64::try_from(exchange.elapsed.as_millis()).unwrap_or(i64::MAX);
        Ok(normalize(exchange.response, elapsed_ms))
    }

    fn apply_defaults(&self, descriptor: RequestDescriptor) -> RequestDescriptor {
        let mut descriptor = descriptor.normalized();
        if descriptor.timeout == 0 {
            descriptor.timeout = self.config.default_timeout;
        }
        if descriptor.proxy.is_none() {
            descriptor.proxy = self.config.default_proxy.clone();
        }
        descriptor
    }

    fn descriptor_for(
        &self,
        method: &str,
        url: &str,
        headers: HeaderList,
        body: Option<RequestBody>,
    ) -> RequestDescriptor {
        let mut descriptor = RequestDescriptor::new(url)
            .with_method(method)
            .with_headers(headers)
            .with_follow_redirects(self.config.follow_redirects)
            .with_insecure_skip_tls(self.config.insecure_skip_tls);
        descriptor.body = body.map(RequestBody::into_string);
        descriptor
    }
}
