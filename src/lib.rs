//! # tlsclient-rs
//!
//! Declarative HTTP requests that present a chosen browser fingerprint.
//!
//! A request is described as data (URL, method, headers, body, options) plus
//! either a named browser profile or a custom JA3-based fingerprint. The
//! client resolves the fingerprint, builds a transport configuration, performs
//! exactly one exchange and returns a normalized JSON-friendly response.
//!
//! ## Features
//!
//! - Named browser profiles with aliases and a sorted listing
//! - Custom fingerprints from a JA3 string plus optional auxiliary lists
//! - HTTP/2 SETTINGS, pseudo-header order and connection window per fingerprint
//! - Per-request cookie store, proxy, timeout and redirect policy
//! - Pluggable transport engine
//!
//! ## Example
//!
//! ```no_run
//! use tlsclient_rs::{RequestDescriptor, TlsClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = TlsClient::new()?;
//!     let descriptor = RequestDescriptor::new("https://tls.peet.ws/api/all")
//!         .with_profile("firefox_117");
//!     let response = client.request(descriptor).await;
//!     println!("{}", response.to_json()?);
//!     Ok(())
//! }
//! ```

mod tls_client;

pub mod config;
pub mod fingerprint;
pub mod modules;
pub mod request;
pub mod response;
pub mod transport;

pub use crate::tls_client::{
    PipelineError,
    RequestBody,
    TlsClient,
    TlsClientBuilder,
    TlsClientConfig,
    TlsClientResult,
};

pub use crate::config::{ConfigError, load_descriptor};

pub use crate::fingerprint::{
    BrowserFamily,
    ClientHelloId,
    ClientProfile,
    CustomFingerprintSpec,
    FingerprintIdentity,
    FingerprintResolver,
    H2Config,
    H2SettingsMapper,
    Ja3Error,
    Ja3Spec,
    ProfileRegistry,
    SpecFactory,
};

pub use crate::request::{HeaderList, RequestDescriptor, ResolvedTransportConfig, assemble};

pub use crate::response::{Cookie, NormalizedResponse, SerializationError, SupportedProfiles, normalize};

pub use crate::transport::{
    EngineResponse,
    RawResponse,
    ReqwestEngine,
    ResponseBody,
    TransportClient,
    TransportEngine,
    TransportError,
    TransportRequest,
};

pub use crate::modules::{ClientEvent, EventDispatcher, EventHandler, LoggingHandler};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
