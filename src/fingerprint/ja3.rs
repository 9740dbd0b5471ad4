//! JA3 fingerprint string parsing.
//!
//! A JA3 string is `version,ciphers,extensions,curves,point_formats`, where
//! every list is dash-delimited decimal values. Lists may be empty; the
//! version may not.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static JA3_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+,(\d+(-\d+)*)?,(\d+(-\d+)*)?,(\d+(-\d+)*)?,(\d+(-\d+)*)?$")
        .expect("invalid JA3 regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Ja3Error {
    #[error("'{0}' is not a version,ciphers,extensions,curves,point_formats record")]
    Malformed(String),
    #[error("{field} value '{value}' is out of range")]
    OutOfRange { field: &'static str, value: String },
}

/// Parsed JA3 record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ja3Spec {
    pub version: u16,
    pub cipher_suites: Vec<u16>,
    pub extensions: Vec<u16>,
    pub curves: Vec<u16>,
    pub point_formats: Vec<u8>,
}

impl Ja3Spec {
    pub fn parse(input: &str) -> Result<Self, Ja3Error> {
        let input = input.trim();
        if !JA3_RE.is_match(input) {
            return Err(Ja3Error::Malformed(input.to_string()));
        }

        let fields: Vec<&str> = input.split(',').collect();
        let version = parse_value::<u16>(fields[0], "TLS version")?;

        Ok(Self {
            version,
            cipher_suites: parse_list(fields[1], "cipher suite")?,
            extensions: parse_list(fields[2], "extension")?,
            curves: parse_list(fields[3], "elliptic curve")?,
            point_formats: parse_list(fields[4], "point format")?,
        })
    }

    pub fn has_extension(&self, id: u16) -> bool {
        self.extensions.contains(&id)
    }
}

impl FromStr for Ja3Spec {
    type Err = Ja3Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ja3Spec::parse(s)
    }
}

impl fmt::Display for Ja3Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{}",
            self.version,
            join(&self.cipher_suites),
            join(&self.extensions),
            join(&self.curves),
            join(&self.point_formats),
        )
    }
}

/// GREASE values (RFC 8701) have the form `0x?A?A` with both bytes equal.
pub fn is_grease(value: u16) -> bool {
    (value & 0x0f0f) == 0x0a0a && (value >> 8) == (value & 0xff)
}

fn parse_value<T: FromStr>(raw: &str, field: &'static str) -> Result<T, Ja3Error> {
    raw.parse::<T>().map_err(|_| Ja3Error::OutOfRange {
        field,
        value: raw.to_string(),
    })
}

fn parse_list<T: FromStr>(raw: &str, field: &'static str) -> Result<Vec<T>, Ja3Error> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    raw.split('-').map(|item| parse_value(item, field)).collect()
}

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("-")
}
