//! Merges a resolved fingerprint with the descriptor's scalar options.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;

use super::RequestDescriptor;
use crate::fingerprint::{FingerprintIdentity, H2Config};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Cookie jar owned by a single resolved configuration.
#[derive(Clone, Default)]
pub struct CookieStore {
    jar: Arc<Jar>,
}

impl CookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jar(&self) -> Arc<Jar> {
        self.jar.clone()
    }

    pub fn is_same_store(&self, other: &CookieStore) -> bool {
        Arc::ptr_eq(&self.jar, &other.jar)
    }
}

impl fmt::Debug for CookieStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieStore").finish_non_exhaustive()
    }
}

/// Internally consistent configuration for exactly one exchange.
#[derive(Debug, Clone)]
pub struct ResolvedTransportConfig {
    pub identity: FingerprintIdentity,
    pub h2: H2Config,
    pub timeout: Duration,
    pub proxy: Option<String>,
    pub follow_redirects: bool,
    pub insecure_skip_tls: bool,
    /// Named profiles shuffle their extension order per connection; custom
    /// fingerprints keep the JA3 order.
    pub randomize_extension_order: bool,
    pub cookie_store: CookieStore,
}

/// Pure assembly step: no I/O, fresh cookie store every call.
pub fn assemble(
    descriptor: &RequestDescriptor,
    identity: FingerprintIdentity,
    h2: H2Config,
) -> ResolvedTransportConfig {
    let timeout = match descriptor.timeout {
        0 => DEFAULT_TIMEOUT_SECS,
        seconds => seconds,
    };
    let randomize_extension_order = !identity.is_custom();

    ResolvedTransportConfig {
        identity,
        h2,
        timeout: Duration::from_secs(timeout),
        proxy: descriptor
            .proxy
            .as_ref()
            .filter(|proxy| !proxy.trim().is_empty())
            .cloned(),
        follow_redirects: descriptor.follow_redirects,
        insecure_skip_tls: descriptor.insecure_skip_tls,
        randomize_extension_order,
        cookie_store: CookieStore::new(),
    }
}
