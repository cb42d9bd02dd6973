//! Non-negative 256-bit quantity of wei.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::hex_fmt::{encode_minimal, HexFmtError};

/// A non-negative 256-bit integer amount of wei.
///
/// Constructed from decimal or hex; always formats as minimal lowercase hex
/// (`0x3e8`, never `0x03e8`; zero is `0x0`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Wei(U256);

impl Wei {
    pub const ZERO: Wei = Wei(U256::ZERO);

    pub fn from_u64(value: u64) -> Self {
        Self(U256::from(value))
    }

    /// Parses a decimal string (no prefix) into a `Wei` value.
    pub fn from_decimal_str(s: &str) -> Result<Self, WeiError> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(WeiError::InvalidDecimal(s.to_string()));
        }
        U256::from_str_radix(s, 10)
            .map(Wei)
            .map_err(|_| WeiError::InvalidDecimal(s.to_string()))
    }

    /// Parses a `0x`-prefixed hex string (any casing, any number of leading
    /// zeros) into a `Wei` value.
    pub fn from_hex_str(s: &str) -> Result<Self, WeiError> {
        let rest = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| WeiError::Hex(HexFmtError::MissingPrefix(s.to_string())))?;
        if rest.is_empty() {
            return Err(WeiError::Hex(HexFmtError::InvalidDigits(s.to_string())));
        }
        U256::from_str_radix(rest, 16)
            .map(Wei)
            .map_err(|_| WeiError::Hex(HexFmtError::InvalidDigits(s.to_string())))
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    /// Emits minimal-hex form: `0x0` for zero, no superfluous leading zeros.
    pub fn to_minimal_hex(&self) -> String {
        encode_minimal(&self.0.to_be_bytes::<32>())
    }

    pub fn checked_add(&self, other: Wei) -> Option<Wei> {
        self.0.checked_add(other.0).map(Wei)
    }

    pub fn checked_mul_u64(&self, factor: u64) -> Option<Wei> {
        self.0.checked_mul(U256::from(factor)).map(Wei)
    }
}

impl fmt::Debug for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Wei({})", self.to_minimal_hex())
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_minimal_hex())
    }
}

impl FromStr for Wei {
    type Err = WeiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("0x") || s.starts_with("0X") {
            Self::from_hex_str(s)
        } else {
            Self::from_decimal_str(s)
        }
    }
}

impl Serialize for Wei {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_minimal_hex())
    }
}

impl<'de> Deserialize<'de> for Wei {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Wei::from_hex_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Errors constructing a [`Wei`] value.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WeiError {
    #[error("{0:?} is not a valid decimal wei amount")]
    InvalidDecimal(String),
    #[error(transparent)]
    Hex(#[from] HexFmtError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_parse_format() {
        // Testable property 1: parse(format(v)) == v, minimal hex.
        for v in [0u64, 1, 1000, 0xdead_beef] {
            let wei = Wei::from_u64(v);
            let formatted = wei.to_minimal_hex();
            let parsed = Wei::from_hex_str(&formatted).unwrap();
            assert_eq!(parsed, wei);
        }
    }

    #[test]
    fn minimal_hex_examples() {
        assert_eq!(Wei::from_u64(1000).to_minimal_hex(), "0x3e8");
        assert_eq!(Wei::from_u64(0).to_minimal_hex(), "0x0");
    }

    #[test]
    fn accepts_non_minimal_hex_on_input() {
        let v = Wei::from_hex_str("0x03e8").unwrap();
        assert_eq!(v, Wei::from_u64(1000));
        assert_eq!(v.to_minimal_hex(), "0x3e8");
    }

    #[test]
    fn decimal_constructor() {
        assert_eq!(Wei::from_decimal_str("1000").unwrap(), Wei::from_u64(1000));
        assert!(Wei::from_decimal_str("-1").is_err());
    }
}
