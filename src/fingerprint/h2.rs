//! HTTP/2 SETTINGS mapping.
//!
//! Translates the setting names accepted in custom fingerprints into protocol
//! identifiers (RFC 9113 §6.5.2) and fills in the Chrome-like defaults used
//! whenever a caller leaves the table or the order empty.

use std::collections::BTreeMap;
use std::fmt;

/// Protocol identifier of a SETTINGS parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum H2SettingId {
    HeaderTableSize = 0x1,
    EnablePush = 0x2,
    MaxConcurrentStreams = 0x3,
    InitialWindowSize = 0x4,
    MaxFrameSize = 0x5,
    MaxHeaderListSize = 0x6,
}

impl H2SettingId {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Option<Self> {
        SETTING_NAMES
            .iter()
            .map(|(_, id)| *id)
            .find(|id| id.code() == code)
    }

    /// Checks `value` against the range RFC 9113 allows for this setting.
    pub fn check(self, value: u32) -> Result<(), String> {
        let in_range = match self {
            H2SettingId::EnablePush => value <= 1,
            H2SettingId::InitialWindowSize => value <= MAX_WINDOW_SIZE,
            H2SettingId::MaxFrameSize => (MIN_FRAME_SIZE..=MAX_FRAME_SIZE).contains(&value),
            H2SettingId::HeaderTableSize
            | H2SettingId::MaxConcurrentStreams
            | H2SettingId::MaxHeaderListSize => true,
        };
        if in_range {
            Ok(())
        } else {
            Err(format!("HTTP/2 setting {self} out of range: {value}"))
        }
    }
}

impl fmt::Display for H2SettingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(H2SettingsMapper::new().to_name(*self))
    }
}

/// Name/identifier pairs understood by the mapper.
const SETTING_NAMES: &[(&str, H2SettingId)] = &[
    ("HEADER_TABLE_SIZE", H2SettingId::HeaderTableSize),
    ("ENABLE_PUSH", H2SettingId::EnablePush),
    ("MAX_CONCURRENT_STREAMS", H2SettingId::MaxConcurrentStreams),
    ("INITIAL_WINDOW_SIZE", H2SettingId::InitialWindowSize),
    ("MAX_FRAME_SIZE", H2SettingId::MaxFrameSize),
    ("MAX_HEADER_LIST_SIZE", H2SettingId::MaxHeaderListSize),
];

/// Table used when a custom fingerprint supplies no settings.
pub const DEFAULT_H2_SETTINGS: &[(&str, u32)] = &[
    ("HEADER_TABLE_SIZE", 65_536),
    ("MAX_CONCURRENT_STREAMS", 1_000),
    ("INITIAL_WINDOW_SIZE", 6_291_456),
    ("MAX_HEADER_LIST_SIZE", 262_144),
];

/// WINDOW_UPDATE increment sent on stream 0 right after the preface.
pub const DEFAULT_CONNECTION_FLOW: u32 = 15_663_105;

/// Connection-level window every HTTP/2 connection starts with.
pub const INITIAL_CONNECTION_WINDOW: u32 = 65_535;

/// Largest flow-control window the protocol allows (2^31 - 1).
pub const MAX_WINDOW_SIZE: u32 = (1 << 31) - 1;

/// Largest connection flow increment that keeps the window within
/// [`MAX_WINDOW_SIZE`].
pub const MAX_CONNECTION_FLOW: u32 = MAX_WINDOW_SIZE - INITIAL_CONNECTION_WINDOW;

/// Bounds of SETTINGS_MAX_FRAME_SIZE.
pub const MIN_FRAME_SIZE: u32 = 16_384;
pub const MAX_FRAME_SIZE: u32 = 16_777_215;

/// HTTP/2 pseudo-header fields, as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoHeader {
    Method,
    Authority,
    Scheme,
    Path,
}

impl PseudoHeader {
    pub fn as_str(self) -> &'static str {
        match self {
            PseudoHeader::Method => ":method",
            PseudoHeader::Authority => ":authority",
            PseudoHeader::Scheme => ":scheme",
            PseudoHeader::Path => ":path",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            ":method" => Some(PseudoHeader::Method),
            ":authority" => Some(PseudoHeader::Authority),
            ":scheme" => Some(PseudoHeader::Scheme),
            ":path" => Some(PseudoHeader::Path),
            _ => None,
        }
    }
}

impl fmt::Display for PseudoHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_PSEUDO_HEADER_ORDER: [PseudoHeader; 4] = [
    PseudoHeader::Method,
    PseudoHeader::Authority,
    PseudoHeader::Scheme,
    PseudoHeader::Path,
];

/// Name-keyed SETTINGS description as supplied by callers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct H2SettingsSpec {
    pub settings_table: BTreeMap<String, u32>,
    pub settings_order: Vec<String>,
}

impl H2SettingsSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_setting(mut self, name: impl Into<String>, value: u32) -> Self {
        self.settings_table.insert(name.into(), value);
        self
    }

    pub fn with_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings_order = order.into_iter().map(Into::into).collect();
        self
    }
}

/// Identifier-keyed SETTINGS ready for a transport engine.
///
/// `order` only ever references identifiers present in `table`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct H2Settings {
    pub table: BTreeMap<H2SettingId, u32>,
    pub order: Vec<H2SettingId>,
}

impl H2Settings {
    pub fn get(&self, id: H2SettingId) -> Option<u32> {
        self.table.get(&id).copied()
    }

    /// Settings in transmission order.
    pub fn ordered(&self) -> impl Iterator<Item = (H2SettingId, u32)> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.table.get(id).map(|value| (*id, *value)))
    }
}

/// Complete HTTP/2 side of a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct H2Config {
    pub settings: H2Settings,
    pub pseudo_header_order: Vec<PseudoHeader>,
    pub connection_flow: u32,
}

impl H2Config {
    /// Initial connection window implied by the connection flow increment,
    /// capped at [`MAX_WINDOW_SIZE`].
    pub fn connection_window(&self) -> u32 {
        INITIAL_CONNECTION_WINDOW
            .saturating_add(self.connection_flow)
            .min(MAX_WINDOW_SIZE)
    }
}

impl Default for H2Config {
    fn default() -> Self {
        Self {
            settings: H2SettingsMapper::new().to_numeric(&H2SettingsSpec::default()),
            pseudo_header_order: DEFAULT_PSEUDO_HEADER_ORDER.to_vec(),
            connection_flow: DEFAULT_CONNECTION_FLOW,
        }
    }
}

/// Bidirectional name/identifier table for SETTINGS parameters.
///
/// The table is static data; the mapper can be copied freely across threads.
#[derive(Debug, Clone, Copy)]
pub struct H2SettingsMapper {
    entries: &'static [(&'static str, H2SettingId)],
}

impl H2SettingsMapper {
    pub fn new() -> Self {
        Self {
            entries: SETTING_NAMES,
        }
    }

    pub fn to_id(&self, name: &str) -> Option<H2SettingId> {
        self.entries
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, id)| *id)
    }

    pub fn to_name(&self, id: H2SettingId) -> &'static str {
        self.entries
            .iter()
            .find(|(_, known)| *known == id)
            .map(|(name, _)| *name)
            .unwrap_or("UNKNOWN")
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    /// Converts a name-keyed spec into identifier-keyed settings.
    ///
    /// Unknown names are dropped from both the table and the order. An empty
    /// table or order falls back to the defaults, and the order is finally
    /// restricted to identifiers the table actually carries.
    pub fn to_numeric(&self, spec: &H2SettingsSpec) -> H2Settings {
        let mut table = BTreeMap::new();
        if spec.settings_table.is_empty() {
            for (name, value) in DEFAULT_H2_SETTINGS {
                if let Some(id) = self.to_id(name) {
                    table.insert(id, *value);
                }
            }
        } else {
            for (name, value) in &spec.settings_table {
                match self.to_id(name) {
                    Some(id) => {
                        table.insert(id, *value);
                    }
                    None => log::debug!("dropping unknown HTTP/2 setting '{name}'"),
                }
            }
        }

        let order_names: Vec<&str> = if spec.settings_order.is_empty() {
            DEFAULT_H2_SETTINGS.iter().map(|(name, _)| *name).collect()
        } else {
            spec.settings_order.iter().map(String::as_str).collect()
        };

        let order = order_names
            .into_iter()
            .filter_map(|name| {
                let id = self.to_id(name);
                if id.is_none() {
                    log::debug!("dropping unknown HTTP/2 setting '{name}' from order");
                }
                id
            })
            .filter(|id| table.contains_key(id))
            .collect();

        H2Settings { table, order }
    }
}

impl Default for H2SettingsMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_ids_round_trip() {
        let mapper = H2SettingsMapper::new();
        for name in mapper.names() {
            let id = mapper.to_id(name).unwrap();
            assert_eq!(mapper.to_name(id), name);
        }
        assert_eq!(mapper.names().count(), 6);
        assert_eq!(mapper.to_id("header_table_size"), None);
    }

    #[test]
    fn codes_match_rfc_identifiers() {
        assert_eq!(H2SettingId::HeaderTableSize.code(), 1);
        assert_eq!(H2SettingId::MaxHeaderListSize.code(), 6);
        assert_eq!(H2SettingId::from_code(4), Some(H2SettingId::InitialWindowSize));
        assert_eq!(H2SettingId::from_code(9), None);
    }

    #[test]
    fn empty_spec_uses_default_table_and_order() {
        let settings = H2SettingsMapper::new().to_numeric(&H2SettingsSpec::default());
        assert_eq!(settings.table.len(), 4);
        assert_eq!(settings.get(H2SettingId::HeaderTableSize), Some(65_536));
        assert_eq!(settings.get(H2SettingId::MaxConcurrentStreams), Some(1_000));
        assert_eq!(settings.get(H2SettingId::InitialWindowSize), Some(6_291_456));
        assert_eq!(settings.get(H2SettingId::MaxHeaderListSize), Some(262_144));
        assert_eq!(
            settings.order,
            vec![
                H2SettingId::HeaderTableSize,
                H2SettingId::MaxConcurrentStreams,
                H2SettingId::InitialWindowSize,
                H2SettingId::MaxHeaderListSize,
            ]
        );
    }

    #[test]
    fn unknown_names_are_dropped_silently() {
        let spec = H2SettingsSpec::new()
            .with_setting("HEADER_TABLE_SIZE", 4_096)
            .with_setting("NO_RFC7540_PRIORITIES", 1)
            .with_order(["NO_RFC7540_PRIORITIES", "HEADER_TABLE_SIZE"]);

        let settings = H2SettingsMapper::new().to_numeric(&spec);
        assert_eq!(settings.table.len(), 1);
        assert_eq!(settings.order, vec![H2SettingId::HeaderTableSize]);
    }

    #[test]
    fn order_is_restricted_to_table_members() {
        let spec = H2SettingsSpec::new()
            .with_setting("ENABLE_PUSH", 0)
            .with_setting("INITIAL_WINDOW_SIZE", 131_072)
            .with_order(["HEADER_TABLE_SIZE", "ENABLE_PUSH", "INITIAL_WINDOW_SIZE"]);

        let settings = H2SettingsMapper::new().to_numeric(&spec);
        assert_eq!(
            settings.order,
            vec![H2SettingId::EnablePush, H2SettingId::InitialWindowSize]
        );
        let ordered: Vec<_> = settings.ordered().collect();
        assert_eq!(
            ordered,
            vec![
                (H2SettingId::EnablePush, 0),
                (H2SettingId::InitialWindowSize, 131_072)
            ]
        );
    }

    #[test]
    fn custom_table_with_default_order_keeps_known_members() {
        let spec = H2SettingsSpec::new()
            .with_setting("HEADER_TABLE_SIZE", 65_536)
            .with_setting("INITIAL_WINDOW_SIZE", 131_072)
            .with_setting("MAX_FRAME_SIZE", 16_384);

        let settings = H2SettingsMapper::new().to_numeric(&spec);
        assert_eq!(
            settings.order,
            vec![H2SettingId::HeaderTableSize, H2SettingId::InitialWindowSize]
        );
        assert!(settings.order.iter().all(|id| settings.table.contains_key(id)));
    }

    #[test]
    fn default_config_matches_chrome_signature() {
        let config = H2Config::default();
        assert_eq!(config.connection_flow, 15_663_105);
        assert_eq!(config.connection_window(), 15_728_640);
        assert_eq!(config.pseudo_header_order, DEFAULT_PSEUDO_HEADER_ORDER.to_vec());
    }

    #[test]
    fn frame_size_bounds_are_inclusive() {
        let id = H2SettingId::MaxFrameSize;
        assert!(id.check(16_384).is_ok());
        assert!(id.check(16_777_215).is_ok());
        assert!(id.check(16_383).is_err());
        assert!(id.check(1_000).is_err());
        assert!(id.check(16_777_216).is_err());
    }

    #[test]
    fn window_and_push_bounds() {
        assert!(H2SettingId::InitialWindowSize.check(MAX_WINDOW_SIZE).is_ok());
        assert!(H2SettingId::InitialWindowSize.check(1 << 31).is_err());
        assert!(H2SettingId::EnablePush.check(1).is_ok());
        assert!(H2SettingId::EnablePush.check(2).is_err());
        assert!(H2SettingId::HeaderTableSize.check(u32::MAX).is_ok());
    }

    #[test]
    fn connection_window_never_exceeds_protocol_maximum() {
        let mut config = H2Config::default();
        config.connection_flow = MAX_CONNECTION_FLOW;
        assert_eq!(config.connection_window(), MAX_WINDOW_SIZE);

        config.connection_flow = u32::MAX;
        assert_eq!(config.connection_window(), MAX_WINDOW_SIZE);
    }

    #[test]
    fn pseudo_headers_parse_their_wire_names() {
        for header in DEFAULT_PSEUDO_HEADER_ORDER {
            assert_eq!(PseudoHeader::parse(header.as_str()), Some(header));
        }
        assert_eq!(PseudoHeader::parse(":status"), None);
    }
}
