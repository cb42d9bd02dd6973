//! Component C1: hex & primitive value types.
//!
//! `Address`, `Hash`, `HexData`, and `Wei` are the crate's immutable value
//! types. Cryptographic primitives (keccak, secp256k1), RLP
//! encoding, and ABI encoding are explicitly out of scope here — those are
//! delegated to `alloy-primitives`/`alloy-dyn-abi` at the call sites that
//! need them (wallet signing, multicall encoding).

mod address;
mod hash;
mod hexdata;
pub mod hex_fmt;
mod wei;

pub use address::{Address, AddressError};
pub use hash::{Hash, HashError};
pub use hexdata::{HexData, HexDataError};
pub use wei::{Wei, WeiError};

/// A block reference: a symbolic tag or an explicit block number.
///
/// See GLOSSARY "Block tag." Serializes to the minimal-hex or literal tag
/// form the node expects for `blockTag` / `blockNumber` parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    Pending,
    Earliest,
    Safe,
    Finalized,
    Number(u64),
}

impl BlockTag {
    pub fn to_rpc_param(self) -> String {
        match self {
            BlockTag::Latest => "latest".to_string(),
            BlockTag::Pending => "pending".to_string(),
            BlockTag::Earliest => "earliest".to_string(),
            BlockTag::Safe => "safe".to_string(),
            BlockTag::Finalized => "finalized".to_string(),
            BlockTag::Number(n) => hex_fmt::encode_u64(n),
        }
    }
}

impl Default for BlockTag {
    fn default() -> Self {
        BlockTag::Latest
    }
}

impl serde::Serialize for BlockTag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rpc_param())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_tag_params() {
        assert_eq!(BlockTag::Latest.to_rpc_param(), "latest");
        assert_eq!(BlockTag::Number(17).to_rpc_param(), "0x11");
    }
}
