//! In-process fake provider for tests.
//!
//! Programmed with a queue of scripted responses keyed by expected method;
//! records the method/param sequence so tests can assert on what the client
//! actually sent. Grounded on the scriptable backend pattern in
//! `ethers-providers`'s `JsonRpcProvider` test doubles.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RpcClientError;

use super::Provider;

/// One scripted response: the method it's expected to answer, and either a
/// success value or an `(code, message, data)` error triple.
pub struct ScriptedResponse {
    pub expected_method: String,
    pub outcome: Result<Value, (i32, String, Option<Value>)>,
}

impl ScriptedResponse {
    pub fn ok(expected_method: impl Into<String>, value: Value) -> Self {
        Self {
            expected_method: expected_method.into(),
            outcome: Ok(value),
        }
    }

    pub fn err(expected_method: impl Into<String>, code: i32, message: impl Into<String>) -> Self {
        Self {
            expected_method: expected_method.into(),
            outcome: Err((code, message.into(), None)),
        }
    }

    pub fn err_with_data(
        expected_method: impl Into<String>,
        code: i32,
        message: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            expected_method: expected_method.into(),
            outcome: Err((code, message.into(), Some(data))),
        }
    }
}

/// One observed call: the method and params the client actually sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: String,
    pub params: Vec<Value>,
}

/// A provider whose responses are scripted in advance and whose calls are
/// recorded for later assertions.
pub struct FakeProvider {
    queue: Mutex<Vec<ScriptedResponse>>,
    recorded: Mutex<Vec<RecordedCall>>,
}

impl FakeProvider {
    pub fn new(scripted: Vec<ScriptedResponse>) -> Self {
        Self {
            queue: Mutex::new(scripted),
            recorded: Mutex::new(Vec::new()),
        }
    }

    /// Returns the method/param sequence observed so far, in call order.
    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.recorded.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for FakeProvider {
    async fn send(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcClientError> {
        self.recorded.lock().unwrap().push(RecordedCall {
            method: method.to_string(),
            params: params.clone(),
        });

        let next = {
            let mut queue = self.queue.lock().unwrap();
            if queue.is_empty() {
                None
            } else {
                Some(queue.remove(0))
            }
        };

        let scripted = next.ok_or_else(|| {
            RpcClientError::illegal_state(format!(
                "FakeProvider received unscripted call to {method}"
            ))
        })?;

        if scripted.expected_method != method {
            return Err(RpcClientError::illegal_state(format!(
                "FakeProvider expected a call to {:?} but received {method:?}",
                scripted.expected_method
            )));
        }

        match scripted.outcome {
            Ok(value) => Ok(value),
            Err((code, message, data)) => Err(RpcClientError::from_rpc_error(code, message, data)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn replays_scripted_responses_in_order() {
        let fake = FakeProvider::new(vec![
            ScriptedResponse::ok("eth_chainId", json!("0x1")),
            ScriptedResponse::ok("eth_blockNumber", json!("0x10")),
        ]);
        assert_eq!(fake.send("eth_chainId", vec![]).await.unwrap(), json!("0x1"));
        assert_eq!(
            fake.send("eth_blockNumber", vec![]).await.unwrap(),
            json!("0x10")
        );
        assert_eq!(fake.recorded_calls().len(), 2);
    }

    #[tokio::test]
    async fn mismatched_method_fails() {
        let fake = FakeProvider::new(vec![ScriptedResponse::ok("eth_chainId", json!("0x1"))]);
        assert!(fake.send("eth_blockNumber", vec![]).await.is_err());
    }
}
