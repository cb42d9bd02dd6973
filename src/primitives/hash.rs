//! 32-byte identifier used for block hashes, transaction hashes, topics, etc.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::hex_fmt::HexFmtError;

/// A 32-byte hash, `0x`-prefixed 64-hex-digit canonical form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash(alloy_primitives::B256);

impl Hash {
    pub const LEN: usize = 32;

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(alloy_primitives::B256::from(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_ref()
    }

    pub fn parse(s: &str) -> Result<Self, HashError> {
        let rest = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| HashError::MissingPrefix(s.to_string()))?;
        if rest.len() != 64 {
            return Err(HashError::Hex(HexFmtError::WrongLength(
                s.to_string(),
                64,
            )));
        }
        let bytes = hex::decode(rest)
            .map_err(|_| HashError::Hex(HexFmtError::InvalidDigits(s.to_string())))?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self::from_bytes(arr))
    }

    pub fn to_canonical_string(&self) -> String {
        format!("0x{}", hex::encode(self.0.as_slice()))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_canonical_string())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

impl FromStr for Hash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<alloy_primitives::B256> for Hash {
    fn from(value: alloy_primitives::B256) -> Self {
        Self(value)
    }
}

impl From<Hash> for alloy_primitives::B256 {
    fn from(value: Hash) -> Self {
        value.0
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical_string())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Hash::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Errors constructing a [`Hash`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HashError {
    #[error("hash {0:?} is missing the 0x prefix")]
    MissingPrefix(String),
    #[error(transparent)]
    Hex(#[from] HexFmtError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_canonicalizes() {
        let h = Hash::parse(&format!("0x{}", "a".repeat(64))).unwrap();
        assert_eq!(h.to_string(), format!("0x{}", "a".repeat(64)));
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(Hash::parse("0xabcd").is_err());
    }
}
