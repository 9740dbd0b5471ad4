//! Named client profiles.
//!
//! The registry maps canonical profile names (`chrome_120`, `safari_ios_17_0`,
//! `okhttp4_android_13`…) to the ClientHello identity a transport engine
//! reproduces. Several names may share an identity when no distinct signature
//! is known for a point release; the alias table is plain data and can be
//! rebuilt through [`ProfileRegistry::builder`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use super::h2::{
    DEFAULT_CONNECTION_FLOW, DEFAULT_PSEUDO_HEADER_ORDER, H2Config, H2SettingsMapper,
    H2SettingsSpec, PseudoHeader,
};
use crate::config::ConfigError;

pub const DEFAULT_PROFILE: &str = "chrome_120";

/// Browser lineage that determines the HTTP/2 half of a named profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrowserFamily {
    Chrome,
    Firefox,
    Safari,
    SafariIos,
    OkHttp,
}

impl BrowserFamily {
    /// HTTP/2 signature shared by every profile of the family.
    pub fn h2_config(self, mapper: &H2SettingsMapper) -> H2Config {
        use PseudoHeader::{Authority, Method, Path, Scheme};

        let (spec, pseudo_header_order, connection_flow) = match self {
            BrowserFamily::Chrome => (
                H2SettingsSpec::default(),
                DEFAULT_PSEUDO_HEADER_ORDER.to_vec(),
                DEFAULT_CONNECTION_FLOW,
            ),
            BrowserFamily::Firefox => (
                H2SettingsSpec::new()
                    .with_setting("HEADER_TABLE_SIZE", 65_536)
                    .with_setting("INITIAL_WINDOW_SIZE", 131_072)
                    .with_setting("MAX_FRAME_SIZE", 16_384)
                    .with_order(["HEADER_TABLE_SIZE", "INITIAL_WINDOW_SIZE", "MAX_FRAME_SIZE"]),
                vec![Method, Path, Authority, Scheme],
                12_517_377,
            ),
            BrowserFamily::Safari => (
                H2SettingsSpec::new()
                    .with_setting("INITIAL_WINDOW_SIZE", 4_194_304)
                    .with_setting("MAX_CONCURRENT_STREAMS", 100)
                    .with_order(["INITIAL_WINDOW_SIZE", "MAX_CONCURRENT_STREAMS"]),
                vec![Method, Scheme, Path, Authority],
                10_485_760,
            ),
            BrowserFamily::SafariIos => (
                H2SettingsSpec::new()
                    .with_setting("ENABLE_PUSH", 0)
                    .with_setting("INITIAL_WINDOW_SIZE", 2_097_152)
                    .with_setting("MAX_CONCURRENT_STREAMS", 100)
                    .with_order(["ENABLE_PUSH", "INITIAL_WINDOW_SIZE", "MAX_CONCURRENT_STREAMS"]),
                vec![Method, Scheme, Path, Authority],
                10_485_760,
            ),
            BrowserFamily::OkHttp => (
                H2SettingsSpec::new()
                    .with_setting("INITIAL_WINDOW_SIZE", 16_777_216)
                    .with_order(["INITIAL_WINDOW_SIZE"]),
                vec![Method, Path, Authority, Scheme],
                16_711_681,
            ),
        };

        H2Config {
            settings: mapper.to_numeric(&spec),
            pseudo_header_order,
            connection_flow,
        }
    }
}

/// ClientHello identity understood by transport engines (`Chrome-120`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientHelloId {
    pub client: &'static str,
    pub version: &'static str,
}

impl fmt::Display for ClientHelloId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.client, self.version)
    }
}

/// Registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientProfile {
    pub hello: ClientHelloId,
    pub family: BrowserFamily,
}

impl ClientProfile {
    pub const fn new(client: &'static str, version: &'static str, family: BrowserFamily) -> Self {
        Self {
            hello: ClientHelloId { client, version },
            family,
        }
    }
}

use BrowserFamily::{Chrome, Firefox, OkHttp, Safari, SafariIos};

const BUILTIN_PROFILES: &[(&str, ClientProfile)] = &[
    ("chrome_103", ClientProfile::new("Chrome", "103", Chrome)),
    ("chrome_104", ClientProfile::new("Chrome", "104", Chrome)),
    ("chrome_105", ClientProfile::new("Chrome", "105", Chrome)),
    ("chrome_106", ClientProfile::new("Chrome", "106", Chrome)),
    ("chrome_107", ClientProfile::new("Chrome", "107", Chrome)),
    ("chrome_108", ClientProfile::new("Chrome", "108", Chrome)),
    ("chrome_109", ClientProfile::new("Chrome", "109", Chrome)),
    ("chrome_110", ClientProfile::new("Chrome", "110", Chrome)),
    ("chrome_111", ClientProfile::new("Chrome", "111", Chrome)),
    ("chrome_112", ClientProfile::new("Chrome", "112", Chrome)),
    ("chrome_117", ClientProfile::new("Chrome", "117", Chrome)),
    ("chrome_120", ClientProfile::new("Chrome", "120", Chrome)),
    ("chrome_124", ClientProfile::new("Chrome", "124", Chrome)),
    ("chrome_131", ClientProfile::new("Chrome", "131", Chrome)),
    ("chrome_133", ClientProfile::new("Chrome", "133", Chrome)),
    ("firefox_102", ClientProfile::new("Firefox", "102", Firefox)),
    ("firefox_104", ClientProfile::new("Firefox", "104", Firefox)),
    ("firefox_105", ClientProfile::new("Firefox", "105", Firefox)),
    ("firefox_106", ClientProfile::new("Firefox", "106", Firefox)),
    ("firefox_108", ClientProfile::new("Firefox", "108", Firefox)),
    ("firefox_110", ClientProfile::new("Firefox", "110", Firefox)),
    ("firefox_117", ClientProfile::new("Firefox", "117", Firefox)),
    ("firefox_120", ClientProfile::new("Firefox", "120", Firefox)),
    ("firefox_123", ClientProfile::new("Firefox", "123", Firefox)),
    ("firefox_132", ClientProfile::new("Firefox", "132", Firefox)),
    ("firefox_133", ClientProfile::new("Firefox", "133", Firefox)),
    ("firefox_135", ClientProfile::new("Firefox", "135", Firefox)),
    ("safari_15_6_1", ClientProfile::new("Safari", "15.6.1", Safari)),
    ("safari_16_0", ClientProfile::new("Safari", "16.0", Safari)),
    ("safari_ios_15_5", ClientProfile::new("iOS", "15.5", SafariIos)),
    ("safari_ios_15_6", ClientProfile::new("iOS", "15.6", SafariIos)),
    ("safari_ios_16_0", ClientProfile::new("iOS", "16.0", SafariIos)),
    ("safari_ios_17_0", ClientProfile::new("iOS", "17.0", SafariIos)),
    ("safari_ios_18_0", ClientProfile::new("iOS", "18.0", SafariIos)),
    ("safari_ios_18_5", ClientProfile::new("iOS", "18.5", SafariIos)),
    ("safari_ipad_15_6", ClientProfile::new("iPadOS", "15.6", SafariIos)),
    ("opera_89", ClientProfile::new("Opera", "89", Chrome)),
    ("opera_90", ClientProfile::new("Opera", "90", Chrome)),
    ("opera_91", ClientProfile::new("Opera", "91", Chrome)),
    ("zalando_android_mobile", ClientProfile::new("ZalandoAndroid", "1", OkHttp)),
    ("zalando_ios_mobile", ClientProfile::new("ZalandoIos", "1", SafariIos)),
    ("nike_ios_mobile", ClientProfile::new("NikeIos", "1", SafariIos)),
    ("nike_android_mobile", ClientProfile::new("NikeAndroid", "1", OkHttp)),
    ("cloudscraper", ClientProfile::new("CloudflareCustom", "1", Chrome)),
    ("mms_ios", ClientProfile::new("MMSIos", "1", SafariIos)),
    ("mms_ios_2", ClientProfile::new("MMSIos", "2", SafariIos)),
    ("mms_ios_3", ClientProfile::new("MMSIos", "3", SafariIos)),
    ("mesh_ios", ClientProfile::new("MeshIos", "1", SafariIos)),
    ("mesh_ios_2", ClientProfile::new("MeshIos", "2", SafariIos)),
    ("mesh_android", ClientProfile::new("MeshAndroid", "1", OkHttp)),
    ("mesh_android_2", ClientProfile::new("MeshAndroid", "2", OkHttp)),
    ("confirmed_ios", ClientProfile::new("ConfirmedIos", "1", SafariIos)),
    ("confirmed_android", ClientProfile::new("ConfirmedAndroid", "1", OkHttp)),
    ("okhttp4_android_7", ClientProfile::new("OkHttp4Android", "7", OkHttp)),
    ("okhttp4_android_8", ClientProfile::new("OkHttp4Android", "8", OkHttp)),
    ("okhttp4_android_9", ClientProfile::new("OkHttp4Android", "9", OkHttp)),
    ("okhttp4_android_10", ClientProfile::new("OkHttp4Android", "10", OkHttp)),
    ("okhttp4_android_11", ClientProfile::new("OkHttp4Android", "11", OkHttp)),
    ("okhttp4_android_12", ClientProfile::new("OkHttp4Android", "12", OkHttp)),
    ("okhttp4_android_13", ClientProfile::new("OkHttp4Android", "13", OkHttp)),
];

/// Names that reuse another profile's signature.
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("chrome_116", "chrome_117"),
    ("chrome_118", "chrome_117"),
    ("chrome_119", "chrome_117"),
    ("firefox_118", "firefox_117"),
    ("firefox_119", "firefox_117"),
    ("safari_16_5", "safari_16_0"),
    ("safari_17_0", "safari_ios_17_0"),
    ("mms_ios_1", "mms_ios"),
    ("mesh_ios_1", "mesh_ios"),
    ("mesh_android_1", "mesh_android"),
    ("edge_99", "chrome_107"),
    ("edge_107", "chrome_107"),
];

static BUILTIN_REGISTRY: Lazy<Arc<ProfileRegistry>> = Lazy::new(|| {
    let mut profiles: BTreeMap<String, ClientProfile> = BUILTIN_PROFILES
        .iter()
        .map(|(name, profile)| (name.to_string(), *profile))
        .collect();
    for (alias, target) in BUILTIN_ALIASES {
        if let Some(profile) = profiles.get(*target).copied() {
            profiles.insert(alias.to_string(), profile);
        }
    }
    Arc::new(ProfileRegistry { profiles })
});

/// Immutable name → profile table.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, ClientProfile>,
}

impl ProfileRegistry {
    /// Shared registry with every shipped profile and alias.
    pub fn builtin() -> Arc<ProfileRegistry> {
        BUILTIN_REGISTRY.clone()
    }

    /// Starts an empty registry; use [`ProfileRegistryBuilder::extend_builtin`]
    /// to start from the shipped table instead.
    pub fn builder() -> ProfileRegistryBuilder {
        ProfileRegistryBuilder::default()
    }

    /// Exact, case-sensitive lookup.
    pub fn resolve(&self, name: &str) -> Result<ClientProfile, ConfigError> {
        self.profiles
            .get(name)
            .copied()
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// Every registered name, sorted lexicographically.
    pub fn list_names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Fluent builder for custom registries.
#[derive(Debug, Default)]
pub struct ProfileRegistryBuilder {
    profiles: BTreeMap<String, ClientProfile>,
}

impl ProfileRegistryBuilder {
    pub fn extend_builtin(mut self) -> Self {
        self.profiles.extend(
            BUILTIN_REGISTRY
                .profiles
                .iter()
                .map(|(name, profile)| (name.clone(), *profile)),
        );
        self
    }

    pub fn with_profile(mut self, name: impl Into<String>, profile: ClientProfile) -> Self {
        self.profiles.insert(name.into(), profile);
        self
    }

    /// Registers `alias` with the signature already registered as `target`.
    pub fn with_alias(
        mut self,
        alias: impl Into<String>,
        target: &str,
    ) -> Result<Self, ConfigError> {
        let profile = self
            .profiles
            .get(target)
            .copied()
            .ok_or_else(|| ConfigError::UnknownProfile(target.to_string()))?;
        self.profiles.insert(alias.into(), profile);
        Ok(self)
    }

    pub fn without(mut self, name: &str) -> Self {
        self.profiles.remove(name);
        self
    }

    pub fn build(self) -> ProfileRegistry {
        ProfileRegistry {
            profiles: self.profiles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::h2::H2SettingId;

    #[test]
    fn every_listed_name_resolves() {
        let registry = ProfileRegistry::builtin();
        assert_eq!(registry.len(), BUILTIN_PROFILES.len() + BUILTIN_ALIASES.len());
        for name in registry.list_names() {
            assert!(registry.resolve(&name).is_ok(), "{name} should resolve");
        }
    }

    #[test]
    fn unknown_or_miscased_names_fail() {
        let registry = ProfileRegistry::builtin();
        for name in ["chrome_999", "Chrome_120", "", "chrome_120 "] {
            match registry.resolve(name) {
                Err(ConfigError::UnknownProfile(reported)) => assert_eq!(reported, name),
                other => panic!("expected UnknownProfile for {name:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn aliases_share_the_target_identity() {
        let registry = ProfileRegistry::builtin();
        let chrome_117 = registry.resolve("chrome_117").unwrap();
        for alias in ["chrome_116", "chrome_118", "chrome_119"] {
            assert_eq!(registry.resolve(alias).unwrap(), chrome_117);
        }
        assert_eq!(
            registry.resolve("edge_99").unwrap(),
            registry.resolve("chrome_107").unwrap()
        );
        assert_eq!(
            registry.resolve("safari_17_0").unwrap().hello.to_string(),
            "iOS-17.0"
        );
    }

    #[test]
    fn listing_is_sorted_and_stable() {
        let registry = ProfileRegistry::builtin();
        let names = registry.list_names();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names, registry.list_names());
        assert!(names.contains(&DEFAULT_PROFILE.to_string()));
    }

    #[test]
    fn builder_supports_custom_aliases() {
        let registry = ProfileRegistry::builder()
            .with_profile("chrome_120", ClientProfile::new("Chrome", "120", BrowserFamily::Chrome))
            .with_alias("chrome_121", "chrome_120")
            .unwrap()
            .build();

        assert_eq!(registry.list_names(), vec!["chrome_120", "chrome_121"]);
        assert!(matches!(
            ProfileRegistry::builder().with_alias("x", "missing"),
            Err(ConfigError::UnknownProfile(_))
        ));
    }

    #[test]
    fn builder_can_start_from_builtin_table() {
        let registry = ProfileRegistry::builder()
            .extend_builtin()
            .without("cloudscraper")
            .build();
        assert!(!registry.contains("cloudscraper"));
        assert!(registry.contains("chrome_120"));
    }

    #[test]
    fn family_signatures_keep_order_within_table() {
        let mapper = H2SettingsMapper::new();
        for family in [
            BrowserFamily::Chrome,
            BrowserFamily::Firefox,
            BrowserFamily::Safari,
            BrowserFamily::SafariIos,
            BrowserFamily::OkHttp,
        ] {
            let config = family.h2_config(&mapper);
            assert!(!config.settings.order.is_empty());
            assert!(
                config
                    .settings
                    .order
                    .iter()
                    .all(|id| config.settings.table.contains_key(id))
            );
            assert_eq!(config.pseudo_header_order.len(), 4);
        }

        let chrome = BrowserFamily::Chrome.h2_config(&mapper);
        assert_eq!(chrome, H2Config::default());
        let firefox = BrowserFamily::Firefox.h2_config(&mapper);
        assert_eq!(
            firefox.settings.get(H2SettingId::InitialWindowSize),
            Some(131_072)
        );
    }
}
