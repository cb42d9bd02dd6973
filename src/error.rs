//! Component C9: the typed error taxonomy.
//!
//! One `thiserror::Error` enum, messages that name the operation and carry
//! the node's original code/message through, `#[from]` wiring for the errors
//! that can only originate in one place.

use std::fmt;

/// How a JSON-RPC error response was classified.
///
/// Classification is a string match on the error message, documented per
/// variant so upstream code branches on a typed kind instead of parsing
/// strings itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcErrorClassification {
    /// Message contains "block range is too large".
    BlockRangeTooLarge,
    /// Message contains "filter not found".
    FilterNotFound,
    /// Message contains "invalid sender".
    InvalidSender,
    /// Message contains "nonce too low".
    NonceTooLow,
    /// Message contains "insufficient funds".
    InsufficientFunds,
    /// Message contains "already known".
    AlreadyKnown,
    /// Message contains "execution reverted"; `decoded_reason` is populated
    /// when the revert data decodes as `Error(string)`.
    Reverted,
    /// No known substring matched.
    Generic,
}

impl RpcErrorClassification {
    /// Classifies a JSON-RPC error message by substring match.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("block range is too large") {
            Self::BlockRangeTooLarge
        } else if lower.contains("filter not found") {
            Self::FilterNotFound
        } else if lower.contains("invalid sender") {
            Self::InvalidSender
        } else if lower.contains("nonce too low") {
            Self::NonceTooLow
        } else if lower.contains("insufficient funds") {
            Self::InsufficientFunds
        } else if lower.contains("already known") {
            Self::AlreadyKnown
        } else if lower.contains("execution reverted") {
            Self::Reverted
        } else {
            Self::Generic
        }
    }
}

impl fmt::Display for RpcErrorClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::BlockRangeTooLarge => "block_range_too_large",
            Self::FilterNotFound => "filter_not_found",
            Self::InvalidSender => "invalid_sender",
            Self::NonceTooLow => "nonce_too_low",
            Self::InsufficientFunds => "insufficient_funds",
            Self::AlreadyKnown => "already_known",
            Self::Reverted => "reverted",
            Self::Generic => "generic",
        };
        f.write_str(tag)
    }
}

/// Stable JSON-RPC error code for every [`RpcClientError::Transport`].
pub const TRANSPORT_ERROR_CODE: i32 = -32001;

/// The crate's single error type, covering every failure surface.
#[derive(Debug, thiserror::Error)]
pub enum RpcClientError {
    /// A JSON-RPC error response, classified per [`RpcErrorClassification`].
    #[error("rpc error [{classification}] (code {code}): {message}")]
    Rpc {
        code: i32,
        message: String,
        data: Option<serde_json::Value>,
        classification: RpcErrorClassification,
        /// Populated only when `classification` is `Reverted` and the
        /// revert data decoded as `Error(string)`.
        decoded_reason: Option<String>,
    },

    /// Transport-level failure: connection, TLS, non-2xx status, malformed
    /// JSON, or any other I/O fault. Always carries the stable JSON-RPC
    /// error code `-32001`, surfaced through [`RpcClientError::code`] the
    /// same way the `Rpc` variant surfaces the node's own code.
    #[error("transport error (http status {http_status:?}, code {}): {cause}", TRANSPORT_ERROR_CODE)]
    Transport {
        http_status: Option<u16>,
        cause: String,
    },

    /// `eth_chainId` disagreed with the wallet's configured chain id.
    #[error("chain mismatch: expected {expected}, node reports {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// A caller-supplied argument violated a documented invariant.
    #[error("invalid argument: {what}")]
    InvalidArgument { what: String },

    /// An operation was attempted in a state that forbids it (closed client,
    /// orphaned multicall recording, batch already executed, closed session).
    ///
    /// The message is exactly `what` with no added prefix: `PublicClient::close`
    /// must fail subsequent calls with a message that equals `Client is
    /// closed` verbatim.
    #[error("{what}")]
    IllegalState { what: String },

    /// The requested operation has no equivalent on the active test-node
    /// backend.
    #[error("unsupported on this backend: {what}")]
    Unsupported { what: String },

    /// ABI decoding of a call/multicall result failed.
    #[error("abi decoding error: {what}")]
    AbiDecoding { what: String },

    /// A deadline elapsed before the operation completed.
    #[error("{operation} timed out after {elapsed_ms}ms")]
    Timeout { operation: String, elapsed_ms: u64 },
}

impl RpcClientError {
    pub fn invalid_argument(what: impl Into<String>) -> Self {
        Self::InvalidArgument { what: what.into() }
    }

    pub fn illegal_state(what: impl Into<String>) -> Self {
        Self::IllegalState { what: what.into() }
    }

    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::Unsupported { what: what.into() }
    }

    pub fn abi_decoding(what: impl Into<String>) -> Self {
        Self::AbiDecoding { what: what.into() }
    }

    pub fn closed_client() -> Self {
        Self::illegal_state("Client is closed")
    }

    /// Builds a classified [`RpcClientError::Rpc`] from a raw JSON-RPC error
    /// object, decoding an `Error(string)` revert reason when applicable.
    pub fn from_rpc_error(code: i32, message: String, data: Option<serde_json::Value>) -> Self {
        let classification = RpcErrorClassification::classify(&message);
        let decoded_reason = if classification == RpcErrorClassification::Reverted {
            data.as_ref()
                .and_then(|d| d.as_str())
                .and_then(decode_error_string_selector)
        } else {
            None
        };
        Self::Rpc {
            code,
            message,
            data,
            classification,
            decoded_reason,
        }
    }

    pub fn transport(http_status: Option<u16>, cause: impl Into<String>) -> Self {
        Self::Transport {
            http_status,
            cause: cause.into(),
        }
    }

    /// The JSON-RPC error code for variants that carry one: the node's own
    /// code for `Rpc`, the fixed [`TRANSPORT_ERROR_CODE`] for `Transport`,
    /// `None` for everything else.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Rpc { code, .. } => Some(*code),
            Self::Transport { .. } => Some(TRANSPORT_ERROR_CODE),
            _ => None,
        }
    }
}

/// Decodes an ABI-encoded `Error(string)` payload (selector `0x08c379a0`)
/// into its revert string, if the hex data begins with that selector.
pub fn decode_error_string_selector(hex_data: &str) -> Option<String> {
    let rest = hex_data.strip_prefix("0x")?;
    let bytes = hex::decode(rest).ok()?;
    if bytes.len() < 4 || bytes[0..4] != [0x08, 0xc3, 0x79, 0xa0] {
        return None;
    }
    let value = alloy_dyn_abi::DynSolType::String
        .abi_decode(&bytes[4..])
        .ok()?;
    match value {
        alloy_dyn_abi::DynSolValue::String(s) => Some(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_by_substring() {
        assert_eq!(
            RpcErrorClassification::classify("nonce too low"),
            RpcErrorClassification::NonceTooLow
        );
        assert_eq!(
            RpcErrorClassification::classify("execution reverted: Unauthorized"),
            RpcErrorClassification::Reverted
        );
        assert_eq!(
            RpcErrorClassification::classify("something else"),
            RpcErrorClassification::Generic
        );
    }

    #[test]
    fn closed_client_message_is_exact() {
        let err = RpcClientError::closed_client();
        assert_eq!(err.to_string(), "Client is closed");
    }

    #[test]
    fn transport_carries_stable_code() {
        let err = RpcClientError::transport(Some(502), "bad gateway");
        assert_eq!(err.code(), Some(TRANSPORT_ERROR_CODE));
        assert_eq!(TRANSPORT_ERROR_CODE, -32001);
    }

    #[test]
    fn rpc_code_passes_through_unchanged() {
        let err = RpcClientError::from_rpc_error(-32000, "nonce too low".into(), None);
        assert_eq!(err.code(), Some(-32000));
    }

    #[test]
    fn non_coded_variants_have_no_code() {
        assert_eq!(RpcClientError::closed_client().code(), None);
    }
}
