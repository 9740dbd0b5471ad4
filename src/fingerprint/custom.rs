//! Custom TLS fingerprints built from a JA3 string.
//!
//! `CustomFingerprintSpec` is the caller-facing description (the `customTls`
//! JSON object). `SpecFactory::build` validates it, fills every omitted list
//! with browser-like defaults and derives the concrete `ClientHelloSpec` a
//! transport engine replays.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::h2::{
    DEFAULT_CONNECTION_FLOW, DEFAULT_PSEUDO_HEADER_ORDER, H2SettingsMapper, H2SettingsSpec,
    MAX_CONNECTION_FLOW, PseudoHeader,
};
use super::ja3::{Ja3Spec, is_grease};
use crate::config::ConfigError;

pub const DEFAULT_SIGNATURE_ALGORITHMS: [&str; 8] = [
    "ECDSAWithP256AndSHA256",
    "PSSWithSHA256",
    "PKCS1WithSHA256",
    "ECDSAWithP384AndSHA384",
    "PSSWithSHA384",
    "PKCS1WithSHA384",
    "PSSWithSHA512",
    "PKCS1WithSHA512",
];
pub const DEFAULT_SUPPORTED_VERSIONS: [&str; 3] = ["GREASE", "1.3", "1.2"];
pub const DEFAULT_KEY_SHARE_CURVES: [&str; 2] = ["GREASE", "X25519"];
pub const DEFAULT_CERT_COMPRESSION: [&str; 2] = ["brotli", "zlib"];
pub const DEFAULT_ALPN_PROTOCOLS: [&str; 2] = ["h2", "http/1.1"];
pub const DEFAULT_ALPS_PROTOCOLS: [&str; 1] = ["h2"];

/// Record size limit advertised when the JA3 lists extension 28 without a value.
pub const DEFAULT_RECORD_SIZE_LIMIT: u16 = 0x4001;
/// ECH payload lengths used when the JA3 lists extension 65037 without candidates.
pub const DEFAULT_ECH_PAYLOADS: [u16; 4] = [128, 160, 192, 224];

const GREASE_PLACEHOLDER: u16 = 0x0a0a;

const SIGNATURE_ALGORITHMS: &[(&str, u16)] = &[
    ("PKCS1WithSHA256", 0x0401),
    ("PKCS1WithSHA384", 0x0501),
    ("PKCS1WithSHA512", 0x0601),
    ("PSSWithSHA256", 0x0804),
    ("PSSWithSHA384", 0x0805),
    ("PSSWithSHA512", 0x0806),
    ("ECDSAWithP256AndSHA256", 0x0403),
    ("ECDSAWithP384AndSHA384", 0x0503),
    ("ECDSAWithP521AndSHA512", 0x0603),
    ("Ed25519", 0x0807),
    ("PKCS1WithSHA1", 0x0201),
    ("ECDSAWithSHA1", 0x0203),
];

const TLS_VERSIONS: &[(&str, u16)] = &[
    ("GREASE", GREASE_PLACEHOLDER),
    ("1.3", 0x0304),
    ("1.2", 0x0303),
    ("1.1", 0x0302),
    ("1.0", 0x0301),
];

const KEY_SHARE_CURVES: &[(&str, u16)] = &[
    ("GREASE", GREASE_PLACEHOLDER),
    ("P256", 23),
    ("P384", 24),
    ("P521", 25),
    ("X25519", 29),
    ("X25519Kyber768", 0x6399),
    ("X25519MLKEM768", 0x11ec),
];

const CERT_COMPRESSION: &[(&str, u16)] = &[("zlib", 1), ("brotli", 2), ("zstd", 3)];

const ECH_KDFS: &[(&str, u16)] = &[("HKDF_SHA256", 1), ("HKDF_SHA384", 2), ("HKDF_SHA512", 3)];

const ECH_AEADS: &[(&str, u16)] = &[
    ("AEAD_AES_128_GCM", 1),
    ("AEAD_AES_256_GCM", 2),
    ("AEAD_CHACHA20_POLY1305", 3),
];

/// HPKE cipher suite offered in a GREASE ECH extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateCipherSuite {
    pub kdf_id: String,
    pub aead_id: String,
}

/// Caller-supplied custom fingerprint (`customTls`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFingerprintSpec {
    pub ja3_string: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub h2_settings: BTreeMap<String, u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub h2_settings_order: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported_signature_algorithms: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported_delegated_credentials_algorithms: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported_versions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_share_curves: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cert_compression_algos: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alpn_protocols: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alps_protocols: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pseudo_header_order: Vec<String>,
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub connection_flow: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ech_candidate_payloads: Vec<u16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ech_candidate_cipher_suites: Vec<CandidateCipherSuite>,
    #[serde(default, skip_serializing_if = "is_zero_u16")]
    pub record_size_limit: u16,
}

fn is_zero_u32(value: &u32) -> bool {
    *value == 0
}

fn is_zero_u16(value: &u16) -> bool {
    *value == 0
}

impl CustomFingerprintSpec {
    /// Spec carrying only a JA3 string; everything else is defaulted on build.
    pub fn from_ja3(ja3: impl Into<String>) -> Self {
        Self {
            ja3_string: ja3.into(),
            ..Self::default()
        }
    }

    /// Parses a `customTls` JSON object.
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(input)
            .map_err(|err| ConfigError::InvalidCustomFingerprint(err.to_string()))
    }

    /// Returns a copy where every empty list or zero value holds its default.
    ///
    /// HTTP/2 settings stay untouched; the settings mapper owns those defaults.
    pub fn with_defaults(&self) -> Self {
        let mut filled = self.clone();
        fill(&mut filled.supported_signature_algorithms, &DEFAULT_SIGNATURE_ALGORITHMS);
        fill(&mut filled.supported_versions, &DEFAULT_SUPPORTED_VERSIONS);
        fill(&mut filled.key_share_curves, &DEFAULT_KEY_SHARE_CURVES);
        fill(&mut filled.cert_compression_algos, &DEFAULT_CERT_COMPRESSION);
        fill(&mut filled.alpn_protocols, &DEFAULT_ALPN_PROTOCOLS);
        fill(&mut filled.alps_protocols, &DEFAULT_ALPS_PROTOCOLS);
        if filled.pseudo_header_order.is_empty() {
            filled.pseudo_header_order = DEFAULT_PSEUDO_HEADER_ORDER
                .iter()
                .map(|header| header.as_str().to_string())
                .collect();
        }
        if filled.connection_flow == 0 {
            filled.connection_flow = DEFAULT_CONNECTION_FLOW;
        }
        filled
    }

    pub fn h2_spec(&self) -> H2SettingsSpec {
        H2SettingsSpec {
            settings_table: self.h2_settings.clone(),
            settings_order: self.h2_settings_order.clone(),
        }
    }
}

fn fill(target: &mut Vec<String>, defaults: &[&str]) {
    if target.is_empty() {
        *target = defaults.iter().map(|value| value.to_string()).collect();
    }
}

/// One extension of a generated ClientHello, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientHelloExtension {
    Grease,
    ServerName,
    StatusRequest,
    SupportedCurves(Vec<u16>),
    PointFormats(Vec<u8>),
    SignatureAlgorithms(Vec<u16>),
    Alpn(Vec<String>),
    SignedCertificateTimestamp,
    Padding,
    ExtendedMasterSecret,
    CompressCertificate(Vec<u16>),
    RecordSizeLimit(u16),
    DelegatedCredentials(Vec<u16>),
    SessionTicket,
    PreSharedKey,
    SupportedVersions(Vec<u16>),
    PskKeyExchangeModes,
    KeyShare(Vec<u16>),
    ApplicationSettings { codepoint: u16, protocols: Vec<String> },
    EncryptedClientHello {
        cipher_suites: Vec<(u16, u16)>,
        payload_lengths: Vec<u16>,
    },
    RenegotiationInfo,
    Generic(u16),
}

impl ClientHelloExtension {
    pub fn id(&self) -> u16 {
        match self {
            ClientHelloExtension::Grease => GREASE_PLACEHOLDER,
            ClientHelloExtension::ServerName => 0,
            ClientHelloExtension::StatusRequest => 5,
            ClientHelloExtension::SupportedCurves(_) => 10,
            ClientHelloExtension::PointFormats(_) => 11,
            ClientHelloExtension::SignatureAlgorithms(_) => 13,
            ClientHelloExtension::Alpn(_) => 16,
            ClientHelloExtension::SignedCertificateTimestamp => 18,
            ClientHelloExtension::Padding => 21,
            ClientHelloExtension::ExtendedMasterSecret => 23,
            ClientHelloExtension::CompressCertificate(_) => 27,
            ClientHelloExtension::RecordSizeLimit(_) => 28,
            ClientHelloExtension::DelegatedCredentials(_) => 34,
            ClientHelloExtension::SessionTicket => 35,
            ClientHelloExtension::PreSharedKey => 41,
            ClientHelloExtension::SupportedVersions(_) => 43,
            ClientHelloExtension::PskKeyExchangeModes => 45,
            ClientHelloExtension::KeyShare(_) => 51,
            ClientHelloExtension::ApplicationSettings { codepoint, .. } => *codepoint,
            ClientHelloExtension::EncryptedClientHello { .. } => 65037,
            ClientHelloExtension::RenegotiationInfo => 65281,
            ClientHelloExtension::Generic(id) => *id,
        }
    }
}

/// Concrete ClientHello template produced by a [`SpecFactory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHelloSpec {
    pub tls_version_min: u16,
    pub tls_version_max: u16,
    pub cipher_suites: Vec<u16>,
    pub compression_methods: Vec<u8>,
    pub extensions: Vec<ClientHelloExtension>,
}

impl ClientHelloSpec {
    pub fn extension_ids(&self) -> Vec<u16> {
        self.extensions.iter().map(ClientHelloExtension::id).collect()
    }

    pub fn extension(&self, id: u16) -> Option<&ClientHelloExtension> {
        self.extensions.iter().find(|ext| ext.id() == id)
    }
}

/// Generator bound to one JA3 string and its defaulted auxiliary lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecFactory {
    params: CustomFingerprintSpec,
    ja3: Ja3Spec,
    pseudo_header_order: Vec<PseudoHeader>,
    hello: ClientHelloSpec,
}

impl SpecFactory {
    pub fn build(spec: &CustomFingerprintSpec) -> Result<Self, ConfigError> {
        let ja3 = Ja3Spec::parse(&spec.ja3_string)?;
        let params = spec.with_defaults();
        check_h2_values(&params)?;
        let pseudo_header_order = parse_pseudo_headers(&params.pseudo_header_order)?;
        let hello = generate_client_hello(&ja3, &params)?;

        Ok(Self {
            params,
            ja3,
            pseudo_header_order,
            hello,
        })
    }

    /// The spec with all defaults applied.
    pub fn params(&self) -> &CustomFingerprintSpec {
        &self.params
    }

    pub fn ja3(&self) -> &Ja3Spec {
        &self.ja3
    }

    pub fn pseudo_header_order(&self) -> &[PseudoHeader] {
        &self.pseudo_header_order
    }

    pub fn connection_flow(&self) -> u32 {
        self.params.connection_flow
    }

    pub fn client_hello_spec(&self) -> &ClientHelloSpec {
        &self.hello
    }

    /// Whether the fingerprint can negotiate HTTP/2 at all.
    pub fn offers_h2(&self) -> bool {
        !self.ja3.has_extension(16) || self.params.alpn_protocols.iter().any(|p| p == "h2")
    }
}

// Unknown setting names are left for the mapper to drop.
fn check_h2_values(params: &CustomFingerprintSpec) -> Result<(), ConfigError> {
    let mapper = H2SettingsMapper::new();
    for (name, value) in &params.h2_settings {
        if let Some(id) = mapper.to_id(name) {
            id.check(*value).map_err(ConfigError::InvalidCustomFingerprint)?;
        }
    }
    if params.connection_flow > MAX_CONNECTION_FLOW {
        return Err(ConfigError::InvalidCustomFingerprint(format!(
            "connection flow out of range: {}",
            params.connection_flow
        )));
    }
    Ok(())
}

fn parse_pseudo_headers(names: &[String]) -> Result<Vec<PseudoHeader>, ConfigError> {
    let mut order = Vec::with_capacity(names.len());
    for name in names {
        let header = PseudoHeader::parse(name).ok_or_else(|| {
            ConfigError::InvalidCustomFingerprint(format!("unknown pseudo-header '{name}'"))
        })?;
        if order.contains(&header) {
            return Err(ConfigError::InvalidCustomFingerprint(format!(
                "duplicate pseudo-header '{name}'"
            )));
        }
        order.push(header);
    }
    Ok(order)
}

fn lookup(
    table: &[(&str, u16)],
    kind: &'static str,
    names: &[String],
) -> Result<Vec<u16>, ConfigError> {
    names
        .iter()
        .map(|name| {
            table
                .iter()
                .find(|(known, _)| known == name)
                .map(|(_, code)| *code)
                .ok_or_else(|| ConfigError::UnknownTlsParameter {
                    kind,
                    name: name.clone(),
                })
        })
        .collect()
}

fn generate_client_hello(
    ja3: &Ja3Spec,
    params: &CustomFingerprintSpec,
) -> Result<ClientHelloSpec, ConfigError> {
    let signature_algorithms = lookup(
        SIGNATURE_ALGORITHMS,
        "signature algorithm",
        &params.supported_signature_algorithms,
    )?;
    let delegated_credentials = if params.supported_delegated_credentials_algorithms.is_empty() {
        signature_algorithms.clone()
    } else {
        lookup(
            SIGNATURE_ALGORITHMS,
            "delegated credentials algorithm",
            &params.supported_delegated_credentials_algorithms,
        )?
    };
    let versions = lookup(TLS_VERSIONS, "TLS version", &params.supported_versions)?;
    let key_shares = lookup(KEY_SHARE_CURVES, "key share curve", &params.key_share_curves)?;
    let compression = lookup(
        CERT_COMPRESSION,
        "certificate compression algorithm",
        &params.cert_compression_algos,
    )?;

    let mut ech_suites = Vec::with_capacity(params.ech_candidate_cipher_suites.len());
    for suite in &params.ech_candidate_cipher_suites {
        let kdf = lookup(ECH_KDFS, "ECH KDF", std::slice::from_ref(&suite.kdf_id))?;
        let aead = lookup(ECH_AEADS, "ECH AEAD", std::slice::from_ref(&suite.aead_id))?;
        ech_suites.push((kdf[0], aead[0]));
    }
    if ech_suites.is_empty() {
        ech_suites.push((1, 1));
    }
    let ech_payloads = if params.ech_candidate_payloads.is_empty() {
        DEFAULT_ECH_PAYLOADS.to_vec()
    } else {
        params.ech_candidate_payloads.clone()
    };

    let extensions = ja3
        .extensions
        .iter()
        .map(|id| match *id {
            id if is_grease(id) => ClientHelloExtension::Grease,
            0 => ClientHelloExtension::ServerName,
            5 => ClientHelloExtension::StatusRequest,
            10 => ClientHelloExtension::SupportedCurves(ja3.curves.clone()),
            11 => ClientHelloExtension::PointFormats(ja3.point_formats.clone()),
            13 => ClientHelloExtension::SignatureAlgorithms(signature_algorithms.clone()),
            16 => ClientHelloExtension::Alpn(params.alpn_protocols.clone()),
            18 => ClientHelloExtension::SignedCertificateTimestamp,
            21 => ClientHelloExtension::Padding,
            23 => ClientHelloExtension::ExtendedMasterSecret,
            27 => ClientHelloExtension::CompressCertificate(compression.clone()),
            28 => ClientHelloExtension::RecordSizeLimit(match params.record_size_limit {
                0 => DEFAULT_RECORD_SIZE_LIMIT,
                limit => limit,
            }),
            34 => ClientHelloExtension::DelegatedCredentials(delegated_credentials.clone()),
            35 => ClientHelloExtension::SessionTicket,
            41 => ClientHelloExtension::PreSharedKey,
            43 => ClientHelloExtension::SupportedVersions(versions.clone()),
            45 => ClientHelloExtension::PskKeyExchangeModes,
            51 => ClientHelloExtension::KeyShare(key_shares.clone()),
            17513 | 17613 => ClientHelloExtension::ApplicationSettings {
                codepoint: *id,
                protocols: params.alps_protocols.clone(),
            },
            65037 => ClientHelloExtension::EncryptedClientHello {
                cipher_suites: ech_suites.clone(),
                payload_lengths: ech_payloads.clone(),
            },
            65281 => ClientHelloExtension::RenegotiationInfo,
            other => ClientHelloExtension::Generic(other),
        })
        .collect();

    let real_versions: Vec<u16> = versions.iter().copied().filter(|v| !is_grease(*v)).collect();
    let tls_version_min = real_versions.iter().copied().min().unwrap_or(ja3.version);
    let tls_version_max = real_versions.iter().copied().max().unwrap_or(ja3.version);

    Ok(ClientHelloSpec {
        tls_version_min,
        tls_version_max,
        cipher_suites: ja3.cipher_suites.clone(),
        compression_methods: vec![0],
        extensions,
    })
}
