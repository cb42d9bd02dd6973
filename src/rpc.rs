//! Component C2: the JSON-RPC 2.0 envelope.
//!
//! Request id allocation is monotonic per provider instance; params pass
//! through as an already-ordered sequence and are never reordered. Debug
//! logging redacts secret-shaped fields before anything is written to the
//! `io.brane.debug` tracing target.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RpcClientError;

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: Vec<Value>,
    pub id: u64,
}

/// A JSON-RPC 2.0 response envelope, as received from a node.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[allow(dead_code)]
    pub jsonrpc: Option<String>,
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

/// The `error` field of a JSON-RPC response.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// The outcome of decoding a response body whose method permits a null
/// result to mean "absent" (e.g. a receipt not yet mined).
pub enum RpcOutcome {
    Result(Value),
    Absent,
}

/// Decodes a raw [`RpcResponse`] into a typed outcome, translating a non-null
/// `error` field into a classified [`RpcClientError::Rpc`].
///
/// `allow_absent` should be `true` for methods whose JSON-RPC semantics treat
/// a null result with no error as a valid "absent" outcome (receipt polling,
/// `loadState`'s null handling is layered on top of this at the call site).
pub fn decode_response(
    response: RpcResponse,
    allow_absent: bool,
) -> Result<RpcOutcome, RpcClientError> {
    if let Some(err) = response.error {
        return Err(RpcClientError::from_rpc_error(
            err.code, err.message, err.data,
        ));
    }
    match response.result {
        Some(Value::Null) | None if allow_absent => Ok(RpcOutcome::Absent),
        Some(value) => Ok(RpcOutcome::Result(value)),
        None => Ok(RpcOutcome::Absent),
    }
}

/// Monotonic per-provider request id allocator.
#[derive(Debug, Default)]
pub struct RequestIdAllocator(AtomicU64);

impl RequestIdAllocator {
    pub fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// Builds a request envelope without reordering `params`.
pub fn build_request(id: u64, method: &str, params: Vec<Value>) -> RpcRequest {
    RpcRequest {
        jsonrpc: "2.0",
        method: method.to_string(),
        params,
        id,
    }
}

/// The case-insensitive set of param keys that are redacted before logging.
const SECRET_KEYS: &[&str] = &["privatekey", "private_key", "mnemonic", "seed", "password"];

/// Recursively redacts secret-shaped fields through nested maps and lists,
/// replacing their value with `0x***[REDACTED]***`.
pub fn redact_for_log(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                if SECRET_KEYS.contains(&k.to_ascii_lowercase().as_str()) {
                    out.insert(k.clone(), Value::String("0x***[REDACTED]***".to_string()));
                } else {
                    out.insert(k.clone(), redact_for_log(v));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_for_log).collect()),
        other => other.clone(),
    }
}

/// Whether `BRANE_DEBUG=1` is set.
pub fn debug_tracing_enabled() -> bool {
    std::env::var("BRANE_DEBUG").map(|v| v == "1").unwrap_or(false)
}

/// Emits a `[RPC]`-prefixed trace line for a request, redacting secrets first.
/// No-op (besides the env lookup) unless debug tracing is enabled.
pub fn trace_request(method: &str, params: &[Value]) {
    if !debug_tracing_enabled() {
        return;
    }
    let redacted: Vec<Value> = params.iter().map(redact_for_log).collect();
    tracing::debug!(
        target: "io.brane.debug",
        "[RPC] -> {method} {}",
        Value::Array(redacted)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_are_monotonic() {
        let ids = RequestIdAllocator::new();
        assert_eq!(ids.next(), 1);
        assert_eq!(ids.next(), 2);
        assert_eq!(ids.next(), 3);
    }

    #[test]
    fn redacts_nested_secret_keys() {
        let value = json!([{"privateKey": "0x1234", "nested": {"mnemonic": "abc"}, "ok": 1}]);
        let redacted = redact_for_log(&value);
        let s = redacted.to_string();
        assert!(s.contains("0x***[REDACTED]***"));
        assert!(!s.contains("0x1234"));
        assert!(!s.contains("\"abc\""));
        assert!(s.contains("\"ok\":1"));
    }

    #[test]
    fn null_result_no_error_is_absent_when_allowed() {
        let response = RpcResponse {
            jsonrpc: Some("2.0".to_string()),
            id: Some(1),
            result: None,
            error: None,
        };
        assert!(matches!(
            decode_response(response, true).unwrap(),
            RpcOutcome::Absent
        ));
    }

    #[test]
    fn error_field_is_classified() {
        let response = RpcResponse {
            jsonrpc: Some("2.0".to_string()),
            id: Some(1),
            result: None,
            error: Some(RpcErrorObject {
                code: -32000,
                message: "nonce too low".to_string(),
                data: None,
            }),
        };
        let err = decode_response(response, false).unwrap_err();
        match err {
            RpcClientError::Rpc { classification, .. } => {
                assert_eq!(
                    classification,
                    crate::error::RpcErrorClassification::NonceTooLow
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
