//! 20-byte account/contract identifier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::hex_fmt::HexFmtError;

/// A 20-byte Ethereum address.
///
/// Equality is case-insensitive on construction: `Address::parse` accepts any
/// mix of upper/lowercase hex digits, but [`Address::to_string`] and
/// serialization always emit the canonical lowercase `0x`-prefixed form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(alloy_primitives::Address);

impl Address {
    pub const LEN: usize = 20;

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(alloy_primitives::Address::from(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        self.0.as_ref()
    }

    /// Parses a `0x`-prefixed 40-hex-digit address, case-insensitively.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let rest = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| AddressError::MissingPrefix(s.to_string()))?;
        if rest.len() != 40 {
            return Err(AddressError::Hex(HexFmtError::WrongLength(
                s.to_string(),
                40,
            )));
        }
        let bytes = hex::decode(rest).map_err(|_| {
            AddressError::Hex(HexFmtError::InvalidDigits(s.to_string()))
        })?;
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self::from_bytes(arr))
    }

    /// Canonical lowercase `0x`-prefixed form.
    pub fn to_canonical_string(&self) -> String {
        format!("0x{}", hex::encode(self.0.as_slice()))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_canonical_string())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<alloy_primitives::Address> for Address {
    fn from(value: alloy_primitives::Address) -> Self {
        Self(value)
    }
}

impl From<Address> for alloy_primitives::Address {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Address::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Errors constructing an [`Address`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address {0:?} is missing the 0x prefix")]
    MissingPrefix(String),
    #[error(transparent)]
    Hex(#[from] HexFmtError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively_and_canonicalizes() {
        let lower = Address::parse("0x1111111111111111111111111111111111111111").unwrap();
        let upper = Address::parse("0X1111111111111111111111111111111111111111").unwrap();
        assert_eq!(lower, upper);
        assert_eq!(
            lower.to_string(),
            "0x1111111111111111111111111111111111111111"
        );
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(Address::parse("0x1234").is_err());
    }

    #[test]
    fn serde_roundtrip() {
        let addr = Address::parse("0x7099797d12a169727a9cbe5f90dfc7b3cee0b906").unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x7099797d12a169727a9cbe5f90dfc7b3cee0b906\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
