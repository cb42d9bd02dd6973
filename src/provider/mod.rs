//! Component C3: provider transports.
//!
//! `Provider` is the uniform `send(method, params) -> result` surface every
//! transport implements; [`crate::client::PublicClient`] is built over a
//! `dyn Provider` (or any concrete `P: Provider`) so HTTP, WebSocket, and the
//! in-process fake are interchangeable. Grounded on the provider/connection
//! trait split in `ethers-connections`
//! (`other_examples/ab8f03f2_gakonst-ethers-rs__ethers-connections-src-provider.rs.rs`)
//! and the request-dispatch shape of `ethers-providers`'s `JsonRpcProvider`.

mod fake;
mod http;
mod ws;

pub use fake::{FakeProvider, ScriptedResponse};
pub use http::HttpProvider;
pub use ws::{SubscriptionCallback, SubscriptionHandle, WebSocketConfig, WsProvider};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RpcClientError;

/// A live subscription's inbound notification, decoded from an
/// `eth_subscription` frame's `result` field.
pub type SubscriptionItem = Value;

/// The uniform transport contract every backend implements.
///
/// `send` performs one request/response round trip, allocating a fresh
/// monotonic request id internally. A null JSON-RPC result is passed through
/// as `Value::Null`; callers that treat null as "absent" (receipt polling,
/// `loadState`) interpret it at that layer, not here.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn send(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcClientError>;

    /// Opens a subscription. Only meaningful for transports that support
    /// server push (WebSocket); the default implementation returns
    /// `Unsupported`.
    async fn subscribe(
        &self,
        method: &str,
        params: Vec<Value>,
        callback: SubscriptionCallback,
    ) -> Result<SubscriptionHandle, RpcClientError> {
        let _ = (method, params, callback);
        Err(RpcClientError::unsupported(
            "this transport does not support subscriptions",
        ))
    }
}
