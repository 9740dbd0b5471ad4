//! Configuration errors and request descriptor loading.
//!
//! Provides:
//! - The `ConfigError` taxonomy raised before any network activity
//! - JSON descriptor loading from disk

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::fingerprint::ja3::Ja3Error;
use crate::request::RequestDescriptor;

/// Failures detected while turning a descriptor into a transport configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("URL must not be empty")]
    EmptyUrl,
    #[error("unsupported browser profile: {0}")]
    UnknownProfile(String),
    #[error("invalid headers payload: {0}")]
    InvalidHeaders(#[source] serde_json::Error),
    #[error("invalid custom TLS configuration: {0}")]
    InvalidCustomFingerprint(String),
    #[error("invalid JA3 string: {0}")]
    InvalidJa3(#[from] Ja3Error),
    #[error("unknown {kind} '{name}'")]
    UnknownTlsParameter { kind: &'static str, name: String },
    #[error("invalid request descriptor: {0}")]
    InvalidDescriptor(#[source] serde_json::Error),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reads a JSON request descriptor from `path`.
pub fn load_descriptor(path: impl AsRef<Path>) -> Result<RequestDescriptor, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    RequestDescriptor::from_json(&contents)
}
