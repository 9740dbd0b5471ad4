//! Chooses between the custom and the named-profile fingerprint paths.

use std::sync::Arc;

use super::custom::{CustomFingerprintSpec, SpecFactory};
use super::h2::{H2Config, H2SettingsMapper};
use super::profiles::{DEFAULT_PROFILE, ProfileRegistry};
use super::FingerprintIdentity;
use crate::config::ConfigError;
use crate::request::RequestDescriptor;

/// Stateless decision function over an injected, read-only registry.
#[derive(Debug, Clone)]
pub struct FingerprintResolver {
    registry: Arc<ProfileRegistry>,
    mapper: H2SettingsMapper,
    default_profile: String,
}

impl FingerprintResolver {
    pub fn new(registry: Arc<ProfileRegistry>) -> Self {
        Self {
            registry,
            mapper: H2SettingsMapper::new(),
            default_profile: DEFAULT_PROFILE.to_string(),
        }
    }

    /// Profile used when a descriptor names none.
    pub fn with_default_profile(mut self, profile: impl Into<String>) -> Self {
        self.default_profile = profile.into();
        self
    }

    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    pub fn default_profile(&self) -> &str {
        &self.default_profile
    }

    /// A custom fingerprint always wins; `profile` is then ignored.
    pub fn resolve(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<(FingerprintIdentity, H2Config), ConfigError> {
        match &descriptor.custom_tls {
            Some(spec) => self.resolve_custom(spec),
            None => self.resolve_profile(&descriptor.profile),
        }
    }

    pub fn resolve_custom(
        &self,
        spec: &CustomFingerprintSpec,
    ) -> Result<(FingerprintIdentity, H2Config), ConfigError> {
        let factory = SpecFactory::build(spec)?;
        let h2 = H2Config {
            settings: self.mapper.to_numeric(&factory.params().h2_spec()),
            pseudo_header_order: factory.pseudo_header_order().to_vec(),
            connection_flow: factory.connection_flow(),
        };
        log::debug!("resolved custom fingerprint {}", factory.ja3());
        Ok((FingerprintIdentity::Custom(Arc::new(factory)), h2))
    }

    pub fn resolve_profile(&self, name: &str) -> Result<(FingerprintIdentity, H2Config), ConfigError> {
        let name = if name.is_empty() {
            self.default_profile.as_str()
        } else {
            name
        };
        let profile = self.registry.resolve(name)?;
        log::debug!("resolved profile {name} -> {}", profile.hello);
        let h2 = profile.family.h2_config(&self.mapper);
        Ok((
            FingerprintIdentity::Profile {
                name: name.to_string(),
                profile,
            },
            h2,
        ))
    }
}

impl Default for FingerprintResolver {
    fn default() -> Self {
        Self::new(ProfileRegistry::builtin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::h2::{H2SettingId, PseudoHeader};
    use crate::fingerprint::profiles::{BrowserFamily, ClientProfile};

    #[test]
    fn named_profile_path() {
        let resolver = FingerprintResolver::default();
        let descriptor = RequestDescriptor::new("https://example.com").with_profile("chrome_120");

        let (identity, h2) = resolver.resolve(&descriptor).unwrap();
        assert_eq!(identity.profile().unwrap().hello.to_string(), "Chrome-120");
        assert_eq!(h2, H2Config::default());
    }

    #[test]
    fn empty_profile_uses_default() {
        let resolver = FingerprintResolver::default();
        let (identity, _) = resolver
            .resolve(&RequestDescriptor::new("https://example.com"))
            .unwrap();
        match identity {
            FingerprintIdentity::Profile { name, .. } => assert_eq!(name, "chrome_120"),
            other => panic!("unexpected identity {other:?}"),
        }
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let resolver = FingerprintResolver::default();
        let descriptor = RequestDescriptor::new("https://example.com").with_profile("chrome_999");
        let err = resolver.resolve(&descriptor).unwrap_err();
        assert!(err.to_string().contains("chrome_999"));
    }

    #[test]
    fn custom_fingerprint_wins_over_profile() {
        let resolver = FingerprintResolver::default();
        for profile in ["firefox_117", "chrome_999", ""] {
            let descriptor = RequestDescriptor::new("https://example.com")
                .with_profile(profile)
                .with_ja3("771,4865-4866,23-65281,29-23,0");
            let (identity, h2) = resolver.resolve(&descriptor).unwrap();
            assert!(identity.is_custom());
            assert_eq!(h2.connection_flow, 15_663_105);
        }
    }

    #[test]
    fn custom_h2_settings_flow_through_mapper() {
        let mut spec = CustomFingerprintSpec::from_ja3("771,4865,0,29,0");
        spec.h2_settings.insert("INITIAL_WINDOW_SIZE".into(), 131_072);
        spec.h2_settings.insert("SOMETHING_NEW".into(), 1);
        spec.h2_settings_order = vec!["SOMETHING_NEW".into(), "INITIAL_WINDOW_SIZE".into()];
        spec.pseudo_header_order = vec![
            ":method".into(),
            ":path".into(),
            ":authority".into(),
            ":scheme".into(),
        ];

        let (_, h2) = FingerprintResolver::default().resolve_custom(&spec).unwrap();
        assert_eq!(h2.settings.table.len(), 1);
        assert_eq!(h2.settings.order, vec![H2SettingId::InitialWindowSize]);
        assert_eq!(h2.pseudo_header_order[1], PseudoHeader::Path);
    }

    #[test]
    fn malformed_ja3_builds_no_identity() {
        let descriptor = RequestDescriptor::new("https://example.com").with_ja3("abc");
        assert!(matches!(
            FingerprintResolver::default().resolve(&descriptor),
            Err(ConfigError::InvalidJa3(_))
        ));
    }

    #[test]
    fn substitute_registry_is_honoured() {
        let registry = ProfileRegistry::builder()
            .with_profile("lab", ClientProfile::new("Firefox", "135", BrowserFamily::Firefox))
            .build();
        let resolver = FingerprintResolver::new(Arc::new(registry)).with_default_profile("lab");

        let (identity, h2) = resolver
            .resolve(&RequestDescriptor::new("https://example.com"))
            .unwrap();
        assert_eq!(identity.profile().unwrap().family, BrowserFamily::Firefox);
        assert_eq!(h2.connection_flow, 12_517_377);
        assert!(
            resolver
                .resolve(&RequestDescriptor::new("https://example.com").with_profile("chrome_120"))
                .is_err()
        );
    }
}
