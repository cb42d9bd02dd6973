//! HTTP transport: one POST per call, synchronous from the caller's
//! perspective.

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::error::RpcClientError;
use crate::rpc::{self, RequestIdAllocator, RpcOutcome, RpcResponse};

use super::Provider;

/// HTTP JSON-RPC transport. Each `send` is a single POST with a single
/// envelope, `Content-Type: application/json`.
pub struct HttpProvider {
    client: reqwest::Client,
    url: Url,
    ids: RequestIdAllocator,
}

impl HttpProvider {
    pub fn new(url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            ids: RequestIdAllocator::new(),
        }
    }

    pub fn with_client(url: Url, client: reqwest::Client) -> Self {
        Self {
            client,
            url,
            ids: RequestIdAllocator::new(),
        }
    }
}

#[async_trait]
impl Provider for HttpProvider {
    async fn send(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcClientError> {
        let id = self.ids.next();
        rpc::trace_request(method, &params);
        let request = rpc::build_request(id, method, params);

        let response = self
            .client
            .post(self.url.clone())
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| RpcClientError::transport(e.status().map(|s| s.as_u16()), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RpcClientError::transport(
                Some(status.as_u16()),
                format!("non-2xx response: {body}"),
            ));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| RpcClientError::transport(None, format!("malformed JSON: {e}")))?;

        match rpc::decode_response(body, true)? {
            RpcOutcome::Result(value) => Ok(value),
            RpcOutcome::Absent => Ok(Value::Null),
        }
    }
}
