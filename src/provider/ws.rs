//! WebSocket transport: a single long-lived bidirectional connection with
//! request/response correlation and subscription demultiplexing.
//!
//! Grounded on the pending-waiter-table pattern used throughout
//! `ethers-providers`/`ethers-connections`'s pubsub plumbing
//! (`other_examples/ab8f03f2_gakonst-ethers-rs__ethers-connections-src-provider.rs.rs`)
//! and `SubscriptionStream`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::error::RpcClientError;
use crate::rpc::{self, RequestIdAllocator, RpcErrorObject};

use super::Provider;

/// Validated WebSocket endpoint configuration.
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    pub url: Url,
}

impl WebSocketConfig {
    /// Validates a raw WebSocket URL string: scheme must be `ws`/`wss`
    /// (case-insensitively) and the host must be non-empty.
    ///
    /// Validation is done on the raw string rather than after `Url::parse`
    /// because `url`'s own "special scheme" handling for `ws`/`wss` already
    /// refuses to parse an empty host — checking first lets us surface an
    /// error message naming the offending scheme instead of a generic parse
    /// failure.
    pub fn new(raw: &str) -> Result<Self, RpcClientError> {
        let scheme_end = raw.find("://").ok_or_else(|| {
            RpcClientError::invalid_argument(format!(
                "WebSocket URL {raw:?} is missing a scheme"
            ))
        })?;
        let scheme = &raw[..scheme_end];
        if !scheme.eq_ignore_ascii_case("ws") && !scheme.eq_ignore_ascii_case("wss") {
            return Err(RpcClientError::invalid_argument(format!(
                "unsupported WebSocket scheme {scheme:?}, expected ws or wss"
            )));
        }

        let rest = &raw[scheme_end + 3..];
        let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
        let host_and_port = authority.rsplit('@').next().unwrap_or("");
        let host = host_and_port.split(':').next().unwrap_or("");
        if host.is_empty() {
            return Err(RpcClientError::invalid_argument(format!(
                "WebSocket URL {raw:?} must have a non-empty host"
            )));
        }

        let url = Url::parse(raw)
            .map_err(|e| RpcClientError::invalid_argument(format!("invalid WebSocket URL: {e}")))?;
        Ok(Self { url })
    }
}

/// Callback invoked, in order, for each notification delivered to a
/// subscription. All callbacks across all subscriptions run on one shared
/// dispatcher task, so no two invocations — whether same or different
/// subscription — ever run concurrently; different subscriptions' items may
/// still interleave in arrival order.
pub type SubscriptionCallback = Arc<dyn Fn(Value) + Send + Sync + 'static>;

type PendingTable = HashMap<u64, oneshot::Sender<Result<Value, RpcClientError>>>;
type SubscriptionTable = HashMap<String, SubscriptionCallback>;

struct Inner {
    ids: RequestIdAllocator,
    writer: Mutex<futures_util::stream::SplitSink<
        tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
        Message,
    >>,
    pending: Mutex<PendingTable>,
    subscriptions: Mutex<SubscriptionTable>,
    dispatch_tx: mpsc::UnboundedSender<(String, Value)>,
    dropped: AtomicBool,
}

/// A live WebSocket JSON-RPC connection.
pub struct WsProvider {
    inner: Arc<Inner>,
}

impl WsProvider {
    /// Connects and spawns the dispatcher task that demultiplexes inbound
    /// frames into response waiters and subscription queues.
    pub async fn connect(config: WebSocketConfig) -> Result<Self, RpcClientError> {
        let (stream, _response) = tokio_tungstenite::connect_async(config.url.as_str())
            .await
            .map_err(|e| RpcClientError::transport(None, format!("ws connect failed: {e}")))?;
        let (writer, mut reader) = stream.split();
        let (dispatch_tx, mut dispatch_rx) = mpsc::unbounded_channel::<(String, Value)>();

        let inner = Arc::new(Inner {
            ids: RequestIdAllocator::new(),
            writer: Mutex::new(writer),
            pending: Mutex::new(HashMap::new()),
            subscriptions: Mutex::new(HashMap::new()),
            dispatch_tx,
            dropped: AtomicBool::new(false),
        });

        // Single callback dispatcher: every subscription's notifications pass
        // through this one task, pulled off a shared queue in arrival order,
        // so two subscriptions' callbacks never run concurrently and one
        // subscription's own notifications stay in order.
        let callback_inner = inner.clone();
        tokio::spawn(async move {
            while let Some((sub_id, payload)) = dispatch_rx.recv().await {
                let callback = callback_inner.subscriptions.lock().await.get(&sub_id).cloned();
                if let Some(callback) = callback {
                    callback(payload);
                }
            }
        });

        let dispatcher_inner = inner.clone();
        tokio::spawn(async move {
            while let Some(message) = reader.next().await {
                match message {
                    Ok(Message::Text(text)) => dispatch_frame(&dispatcher_inner, &text).await,
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
            invalidate(&dispatcher_inner).await;
        });

        Ok(Self { inner })
    }
}

/// Parses one inbound text frame and routes it either to a pending response
/// waiter (has `id`) or to a subscription's notification queue (method
/// `eth_subscription`).
async fn dispatch_frame(inner: &Arc<Inner>, text: &str) {
    let Ok(value) = serde_json::from_str::<Value>(text) else {
        return;
    };

    if let Some(id) = value.get("id").and_then(Value::as_u64) {
        let outcome = if let Some(err) = value.get("error").filter(|e| !e.is_null()) {
            let err: RpcErrorObject = match serde_json::from_value(err.clone()) {
                Ok(e) => e,
                Err(_) => return,
            };
            Err(RpcClientError::from_rpc_error(
                err.code, err.message, err.data,
            ))
        } else {
            Ok(value.get("result").cloned().unwrap_or(Value::Null))
        };
        let mut pending = inner.pending.lock().await;
        if let Some(sender) = pending.remove(&id) {
            let _ = sender.send(outcome);
        }
        return;
    }

    if value.get("method").and_then(Value::as_str) == Some("eth_subscription") {
        let Some(params) = value.get("params") else {
            return;
        };
        let Some(sub_id) = params.get("subscription").and_then(Value::as_str) else {
            return;
        };
        let payload = params.get("result").cloned().unwrap_or(Value::Null);
        let _ = inner.dispatch_tx.send((sub_id.to_string(), payload));
    }
}

/// On disconnect: every outstanding waiter fails with a transport error and
/// every subscription queue is dropped so its dispatcher task exits.
async fn invalidate(inner: &Arc<Inner>) {
    inner.dropped.store(true, Ordering::SeqCst);
    let mut pending = inner.pending.lock().await;
    for (_, sender) in pending.drain() {
        let _ = sender.send(Err(RpcClientError::transport(
            None,
            "WebSocket connection dropped",
        )));
    }
    inner.subscriptions.lock().await.clear();
}

#[async_trait]
impl Provider for WsProvider {
    async fn send(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcClientError> {
        if self.inner.dropped.load(Ordering::SeqCst) {
            return Err(RpcClientError::transport(
                None,
                "WebSocket connection dropped",
            ));
        }
        let id = self.inner.ids.next();
        rpc::trace_request(method, &params);
        let request = rpc::build_request(id, method, params);
        let text = serde_json::to_string(&request)
            .map_err(|e| RpcClientError::transport(None, format!("encode failed: {e}")))?;

        let (tx, rx) = oneshot::channel();
        self.inner.pending.lock().await.insert(id, tx);

        {
            let mut writer = self.inner.writer.lock().await;
            if let Err(e) = writer.send(Message::text(text)).await {
                self.inner.pending.lock().await.remove(&id);
                return Err(RpcClientError::transport(None, format!("ws send failed: {e}")));
            }
        }

        rx.await
            .map_err(|_| RpcClientError::transport(None, "WebSocket connection dropped"))?
    }

    async fn subscribe(
        &self,
        method: &str,
        params: Vec<Value>,
        callback: SubscriptionCallback,
    ) -> Result<SubscriptionHandle, RpcClientError> {
        let result = self.send(method, params).await?;
        let sub_id = result
            .as_str()
            .ok_or_else(|| RpcClientError::abi_decoding("eth_subscribe did not return a string id"))?
            .to_string();

        self.inner
            .subscriptions
            .lock()
            .await
            .insert(sub_id.clone(), callback);

        Ok(SubscriptionHandle {
            id: sub_id,
            inner: self.inner.clone(),
        })
    }
}

/// Handle to a live subscription. `close` unsubscribes and removes the local
/// dispatch entry.
pub struct SubscriptionHandle {
    id: String,
    inner: Arc<Inner>,
}

impl SubscriptionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn close(&self) -> Result<(), RpcClientError> {
        self.inner.subscriptions.lock().await.remove(&self.id);
        let provider = WsProvider {
            inner: self.inner.clone(),
        };
        provider
            .send("eth_unsubscribe", vec![Value::String(self.id.clone())])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_ws_scheme() {
        assert!(WebSocketConfig::new("http://localhost:8545").is_err());
    }

    #[test]
    fn rejects_empty_host() {
        assert!(WebSocketConfig::new("ws:///path").is_err());
        assert!(WebSocketConfig::new("ws://").is_err());
    }

    #[test]
    fn accepts_ws_and_wss_case_insensitively() {
        assert!(WebSocketConfig::new("ws://localhost:8546").is_ok());
        assert!(WebSocketConfig::new("WSS://localhost:8546").is_ok());
    }
}
