//! Component C8: the test-node controller.
//!
//! One method-name dispatch table across three backends, grounded on the
//! per-mode RPC prefixes `anvil_*` / `hardhat_*` / `evm_*` that Anvil,
//! Hardhat, and Ganache actually expose for the same operations.

use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::json;

use crate::client::{CallRequest, PublicClient};
use crate::error::RpcClientError;
use crate::primitives::{hex_fmt, Address, HexData, Wei};

/// Which test-node backend this controller is dispatching to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestNodeMode {
    Anvil,
    Hardhat,
    Ganache,
}

impl TestNodeMode {
    fn name(self) -> &'static str {
        match self {
            TestNodeMode::Anvil => "Anvil",
            TestNodeMode::Hardhat => "Hardhat",
            TestNodeMode::Ganache => "Ganache",
        }
    }
}

/// An opaque snapshot identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotId(String);

impl SnapshotId {
    pub fn parse(s: &str) -> Result<Self, RpcClientError> {
        let rest = s
            .strip_prefix("0x")
            .ok_or_else(|| RpcClientError::invalid_argument(format!("{s:?} is not a snapshot id")))?;
        if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(RpcClientError::invalid_argument(format!(
                "{s:?} is not a valid snapshot id"
            )));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn unsupported(operation: &str, mode: TestNodeMode, required: &str) -> RpcClientError {
    RpcClientError::unsupported(format!(
        "{operation} is not supported on {}; requires {required}",
        mode.name()
    ))
}

/// Manages snapshot/revert, impersonation, state dump/load, and block
/// parameters against a running test node.
pub struct TestNodeController {
    client: PublicClient,
    mode: TestNodeMode,
}

impl TestNodeController {
    pub fn new(client: PublicClient, mode: TestNodeMode) -> Self {
        Self { client, mode }
    }

    pub fn mode(&self) -> TestNodeMode {
        self.mode
    }

    /// `evm_snapshot`, uniform across all three backends.
    pub async fn snapshot(&self) -> Result<SnapshotId, RpcClientError> {
        let value = self.client.raw_send("evm_snapshot", vec![]).await?;
        let s = value
            .as_str()
            .ok_or_else(|| RpcClientError::abi_decoding("evm_snapshot did not return a string"))?;
        SnapshotId::parse(s)
    }

    /// `evm_revert`, uniform across all three backends.
    pub async fn revert(&self, snapshot: &SnapshotId) -> Result<bool, RpcClientError> {
        let value = self
            .client
            .raw_send("evm_revert", vec![json!(snapshot.as_str())])
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    pub async fn set_next_block_base_fee(&self, fee: Wei) -> Result<(), RpcClientError> {
        let method = match self.mode {
            TestNodeMode::Anvil => "anvil_setNextBlockBaseFeePerGas",
            TestNodeMode::Hardhat => "hardhat_setNextBlockBaseFeePerGas",
            TestNodeMode::Ganache => {
                return Err(unsupported("setNextBlockBaseFee", self.mode, "Anvil or Hardhat"))
            }
        };
        self.client.raw_send(method, vec![json!(fee)]).await?;
        Ok(())
    }

    /// Scenario S5: issues `{anvil,hardhat,evm}_setBlockGasLimit` with the
    /// gas limit as a single minimal-hex param.
    pub async fn set_block_gas_limit(&self, limit: u64) -> Result<(), RpcClientError> {
        let method = match self.mode {
            TestNodeMode::Anvil => "anvil_setBlockGasLimit",
            TestNodeMode::Hardhat => "hardhat_setBlockGasLimit",
            TestNodeMode::Ganache => "evm_setBlockGasLimit",
        };
        self.client
            .raw_send(method, vec![json!(hex_fmt::encode_u64(limit))])
            .await?;
        Ok(())
    }

    fn impersonate_method(&self) -> &'static str {
        match self.mode {
            TestNodeMode::Anvil => "anvil_impersonateAccount",
            TestNodeMode::Hardhat => "hardhat_impersonateAccount",
            TestNodeMode::Ganache => "evm_impersonateAccount",
        }
    }

    fn stop_impersonate_method(&self) -> &'static str {
        match self.mode {
            TestNodeMode::Anvil => "anvil_stopImpersonatingAccount",
            TestNodeMode::Hardhat => "hardhat_stopImpersonatingAccount",
            TestNodeMode::Ganache => "evm_stopImpersonatingAccount",
        }
    }

    pub async fn impersonate(&self, address: Address) -> Result<ImpersonationSession, RpcClientError> {
        self.client
            .raw_send(self.impersonate_method(), vec![json!(address)])
            .await?;
        Ok(ImpersonationSession {
            client: self.client.clone(),
            stop_method: self.stop_impersonate_method(),
            address,
            closed: AtomicBool::new(false),
        })
    }

    /// Anvil-only toggle for auto-impersonation of any `from` address.
    pub async fn set_auto_impersonate(&self, enabled: bool) -> Result<(), RpcClientError> {
        if self.mode != TestNodeMode::Anvil {
            return Err(unsupported("auto-impersonate", self.mode, "Anvil"));
        }
        self.client
            .raw_send("anvil_autoImpersonateAccount", vec![json!(enabled)])
            .await?;
        Ok(())
    }

    /// Anvil-only. Raises a distinct error when the node returns null with no
    /// RPC error.
    pub async fn dump_state(&self) -> Result<HexData, RpcClientError> {
        if self.mode != TestNodeMode::Anvil {
            return Err(unsupported("dumpState", self.mode, "Anvil"));
        }
        let value = self.client.raw_send("anvil_dumpState", vec![]).await?;
        let s = value.as_str().ok_or_else(|| {
            RpcClientError::abi_decoding("anvil_dumpState returned null with no error")
        })?;
        HexData::parse(s).map_err(|e| RpcClientError::abi_decoding(e.to_string()))
    }

    /// Anvil-only. Node failure or a null result is reported as `false`, not
    /// raised.
    pub async fn load_state(&self, state: &HexData) -> Result<bool, RpcClientError> {
        if self.mode != TestNodeMode::Anvil {
            return Err(unsupported("loadState", self.mode, "Anvil"));
        }
        match self
            .client
            .raw_send("anvil_loadState", vec![json!(state)])
            .await
        {
            Ok(value) => Ok(value.as_bool().unwrap_or(false)),
            Err(_) => Ok(false),
        }
    }
}

/// A scoped impersonation grant.
///
/// `close` is idempotent, never raises, and sends the stop-impersonation RPC
/// at most once across any number of calls: the closed
/// flag is flipped before the RPC attempt, so a failing stop call still
/// leaves the session closed.
pub struct ImpersonationSession {
    client: PublicClient,
    stop_method: &'static str,
    address: Address,
    closed: AtomicBool,
}

impl ImpersonationSession {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn guard(&self) -> Result<(), RpcClientError> {
        if self.is_closed() {
            Err(RpcClientError::illegal_state("impersonation session is closed"))
        } else {
            Ok(())
        }
    }

    /// Overrides `from` on a call request to the impersonated address, even
    /// when the request already names a different `from`.
    pub fn apply_to(&self, mut request: CallRequest) -> Result<CallRequest, RpcClientError> {
        self.guard()?;
        request.from = Some(self.address);
        Ok(request)
    }

    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self
            .client
            .raw_send(self.stop_method, vec![json!(self.address)])
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{FakeProvider, ScriptedResponse};
    use std::sync::Arc;

    fn client_with(scripted: Vec<ScriptedResponse>) -> PublicClient {
        PublicClient::new(Arc::new(FakeProvider::new(scripted)))
    }

    #[tokio::test]
    async fn scenario_s5_dispatch_table() {
        for (mode, expected_method) in [
            (TestNodeMode::Anvil, "anvil_setBlockGasLimit"),
            (TestNodeMode::Hardhat, "hardhat_setBlockGasLimit"),
            (TestNodeMode::Ganache, "evm_setBlockGasLimit"),
        ] {
            let fake = FakeProvider::new(vec![ScriptedResponse::ok(expected_method, json!(true))]);
            let client = PublicClient::new(Arc::new(fake));
            let controller = TestNodeController::new(client, mode);
            controller.set_block_gas_limit(30_000_000).await.unwrap();
        }
    }

    #[tokio::test]
    async fn ganache_rejects_set_next_block_base_fee() {
        let controller = TestNodeController::new(client_with(vec![]), TestNodeMode::Ganache);
        let err = controller
            .set_next_block_base_fee(Wei::from_u64(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RpcClientError::Unsupported { .. }));
    }

    #[tokio::test]
    async fn close_sends_stop_rpc_at_most_once() {
        let address = Address::parse("0x7099797d12a169727a9cbe5f90dfc7b3cee0b906").unwrap();
        let client = client_with(vec![
            ScriptedResponse::ok("anvil_impersonateAccount", json!(true)),
            ScriptedResponse::ok("anvil_stopImpersonatingAccount", json!(true)),
        ]);
        let controller = TestNodeController::new(client, TestNodeMode::Anvil);
        let session = controller.impersonate(address).await.unwrap();
        session.close().await;
        session.close().await; // must not issue a second RPC; fake has none queued.
        assert!(session.is_closed());
    }

    #[tokio::test]
    async fn scenario_s4_impersonation_overrides_from() {
        let impersonated = Address::parse("0x7099797d12a169727a9cbe5f90dfc7b3cee0b906").unwrap();
        let other = Address::parse("0x90f79bf6eb2c4f870365e785982e1f101e93b906").unwrap();
        let client = client_with(vec![ScriptedResponse::ok("anvil_impersonateAccount", json!(true))]);
        let controller = TestNodeController::new(client, TestNodeMode::Anvil);
        let session = controller.impersonate(impersonated).await.unwrap();

        let request = CallRequest::builder().from_address(other).build().unwrap();
        let overridden = session.apply_to(request).unwrap();
        assert_eq!(overridden.to_map()["from"], json!(impersonated));
    }

    #[tokio::test]
    async fn closed_session_rejects_apply_to() {
        let address = Address::parse("0x7099797d12a169727a9cbe5f90dfc7b3cee0b906").unwrap();
        let client = client_with(vec![
            ScriptedResponse::ok("anvil_impersonateAccount", json!(true)),
            ScriptedResponse::ok("anvil_stopImpersonatingAccount", json!(true)),
        ]);
        let controller = TestNodeController::new(client, TestNodeMode::Anvil);
        let session = controller.impersonate(address).await.unwrap();
        session.close().await;
        let err = session
            .apply_to(CallRequest::builder().build().unwrap())
            .unwrap_err();
        assert!(err.to_string().contains("closed"));
    }

    #[tokio::test]
    async fn load_state_reports_rpc_failure_as_false() {
        let client = client_with(vec![ScriptedResponse::err(
            "anvil_loadState",
            -32000,
            "boom",
        )]);
        let controller = TestNodeController::new(client, TestNodeMode::Anvil);
        let data = HexData::parse("0x1234").unwrap();
        assert_eq!(controller.load_state(&data).await.unwrap(), false);
    }
}
