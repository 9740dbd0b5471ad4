//! Fingerprint resolution.
//!
//! Turns the fingerprint half of a request descriptor (named profile or custom
//! JA3 spec) into a [`FingerprintIdentity`] plus the matching HTTP/2 config.

pub mod custom;
pub mod h2;
pub mod ja3;
pub mod profiles;
pub mod resolver;

use std::sync::Arc;

pub use custom::{
    CandidateCipherSuite, ClientHelloExtension, ClientHelloSpec, CustomFingerprintSpec,
    SpecFactory,
};
pub use h2::{H2Config, H2SettingId, H2Settings, H2SettingsMapper, H2SettingsSpec, PseudoHeader};
pub use ja3::{Ja3Error, Ja3Spec};
pub use profiles::{BrowserFamily, ClientHelloId, ClientProfile, ProfileRegistry, ProfileRegistryBuilder};
pub use resolver::FingerprintResolver;

/// Resolved TLS identity handed to the transport engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FingerprintIdentity {
    /// A registry profile, kept with the name it was requested under.
    Profile { name: String, profile: ClientProfile },
    /// A ClientHello generated from a custom JA3 spec.
    Custom(Arc<SpecFactory>),
}

impl FingerprintIdentity {
    pub fn is_custom(&self) -> bool {
        matches!(self, FingerprintIdentity::Custom(_))
    }

    pub fn profile(&self) -> Option<&ClientProfile> {
        match self {
            FingerprintIdentity::Profile { profile, .. } => Some(profile),
            FingerprintIdentity::Custom(_) => None,
        }
    }

    pub fn spec_factory(&self) -> Option<&SpecFactory> {
        match self {
            FingerprintIdentity::Profile { .. } => None,
            FingerprintIdentity::Custom(factory) => Some(factory),
        }
    }

    /// Short human-readable label used in logs and events.
    pub fn label(&self) -> String {
        match self {
            FingerprintIdentity::Profile { name, profile } => format!("{name} ({})", profile.hello),
            FingerprintIdentity::Custom(factory) => format!("CustomJA3 ({})", factory.ja3()),
        }
    }
}
