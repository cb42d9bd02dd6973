//! Arbitrary-length byte string, `0x`-prefixed, even digit count.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::hex_fmt::HexFmtError;

/// An arbitrary-length byte string. The empty value is `0x`.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct HexData(Vec<u8>);

impl HexData {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn parse(s: &str) -> Result<Self, HexDataError> {
        let rest = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| HexDataError::MissingPrefix(s.to_string()))?;
        if rest.len() % 2 != 0 {
            return Err(HexDataError::Hex(HexFmtError::OddLength(s.to_string())));
        }
        let bytes = hex::decode(rest)
            .map_err(|_| HexDataError::Hex(HexFmtError::InvalidDigits(s.to_string())))?;
        Ok(Self(bytes))
    }

    pub fn to_canonical_string(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }

    /// Whether this data begins with the given 4-byte function selector.
    pub fn starts_with_selector(&self, selector: [u8; 4]) -> bool {
        self.0.starts_with(&selector)
    }
}

impl fmt::Debug for HexData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HexData({})", self.to_canonical_string())
    }
}

impl fmt::Display for HexData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

impl FromStr for HexData {
    type Err = HexDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Vec<u8>> for HexData {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl Serialize for HexData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical_string())
    }
}

impl<'de> Deserialize<'de> for HexData {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        HexData::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Errors constructing [`HexData`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HexDataError {
    #[error("hex data {0:?} is missing the 0x prefix")]
    MissingPrefix(String),
    #[error(transparent)]
    Hex(#[from] HexFmtError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_value_is_0x() {
        assert_eq!(HexData::empty().to_string(), "0x");
        assert_eq!(HexData::parse("0x").unwrap(), HexData::empty());
    }

    #[test]
    fn rejects_odd_digit_count() {
        assert!(HexData::parse("0xabc").is_err());
    }

    #[test]
    fn selector_prefix_check() {
        let data = HexData::parse("0x08c379a000000000").unwrap();
        assert!(data.starts_with_selector([0x08, 0xc3, 0x79, 0xa0]));
    }
}
