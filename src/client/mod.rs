//! Component C4: the typed RPC façade.
//!
//! One method per supported `eth_*` call, parameter building, and result
//! decoding, all layered over a `dyn Provider`. Grounded on the breadth and
//! naming of `ethers-providers`'s `JsonRpcProvider` trait
//! (`other_examples/6afb5a29_gakonst-ethers-rs__ethers-providers-src-new_provider.rs.rs`),
//! adapted from a blanket trait over generic transports to a concrete struct
//! over `Arc<dyn Provider>` since this crate has no ENS/trace/uncle surface
//! to keep generic over.

mod types;

pub use types::{
    AccessListEntry, AccountOverride, Block, CallRequest, CallRequestBuilder, CallResult, Log,
    LogFilter, Transaction, TransactionReceipt,
};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::{RpcClientError, RpcErrorClassification};
use crate::primitives::{hex_fmt, Address, BlockTag, Hash, HexData, Wei};
use crate::provider::{Provider, SubscriptionCallback, SubscriptionHandle};

/// A typed façade over the Ethereum execution-layer JSON-RPC protocol.
///
/// Cheaply clonable: the provider is held behind an `Arc`, and `close()` is
/// shared across clones — closing one closes all.
#[derive(Clone)]
pub struct PublicClient {
    provider: Arc<dyn Provider>,
    closed: Arc<AtomicBool>,
}

impl PublicClient {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Idempotent close. After closing, every operation fails with a
    /// closed-state error whose message is exactly `Client is closed`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn guard(&self) -> Result<(), RpcClientError> {
        if self.is_closed() {
            Err(RpcClientError::closed_client())
        } else {
            Ok(())
        }
    }

    async fn send(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcClientError> {
        self.guard()?;
        self.provider.send(method, params).await
    }

    pub async fn get_chain_id(&self) -> Result<u64, RpcClientError> {
        let value = self.send("eth_chainId", vec![]).await?;
        parse_hex_u64(&value)
    }

    pub async fn get_balance(
        &self,
        address: Address,
        block: BlockTag,
    ) -> Result<Wei, RpcClientError> {
        let value = self
            .send(
                "eth_getBalance",
                vec![json!(address), json!(block.to_rpc_param())],
            )
            .await?;
        parse_wei(&value)
    }

    pub async fn get_latest_block(&self) -> Result<Block, RpcClientError> {
        self.get_block_by_number(BlockTag::Latest).await
    }

    pub async fn get_block_by_number(&self, block: BlockTag) -> Result<Block, RpcClientError> {
        let value = self
            .send(
                "eth_getBlockByNumber",
                vec![json!(block.to_rpc_param()), json!(false)],
            )
            .await?;
        parse_block(&value)
    }

    pub async fn get_transaction_by_hash(
        &self,
        hash: Hash,
    ) -> Result<Option<Transaction>, RpcClientError> {
        let value = self
            .send("eth_getTransactionByHash", vec![json!(hash)])
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(parse_transaction(&value)?))
    }

    /// Returns `None` when the node returns null (receipt not yet mined).
    pub async fn get_transaction_receipt(
        &self,
        hash: Hash,
    ) -> Result<Option<TransactionReceipt>, RpcClientError> {
        let value = self
            .send("eth_getTransactionReceipt", vec![json!(hash)])
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(parse_receipt(&value)?))
    }

    pub async fn call(
        &self,
        request: &CallRequest,
        block: BlockTag,
    ) -> Result<HexData, RpcClientError> {
        let mut params = vec![request.to_map(), json!(block.to_rpc_param())];
        if let Some(overrides) = request.state_overrides_map() {
            params.push(overrides);
        }
        let value = self.send("eth_call", params).await?;
        let s = value
            .as_str()
            .ok_or_else(|| RpcClientError::abi_decoding("eth_call result was not a hex string"))?;
        HexData::parse(s).map_err(|e| RpcClientError::abi_decoding(e.to_string()))
    }

    /// Simulates `request` via `eth_call` and classifies the outcome as a
    /// [`CallResult`] instead of surfacing a revert as an error. A revert
    /// yields `Failure` with the decoded `Error(string)` reason when
    /// available; any other RPC or transport failure still propagates as
    /// `Err`. Gas use is filled in via `eth_estimateGas` on the same
    /// request, best-effort: an estimate failure after a successful call
    /// leaves `gas_used` at `0` rather than discarding the call result.
    /// `eth_call` carries no log surface, so `logs` is always empty here;
    /// [`TransactionReceipt::into_call_result`] is the counterpart for a
    /// mined transaction's actual logs.
    pub async fn simulate_call(
        &self,
        request: &CallRequest,
        block: BlockTag,
    ) -> Result<CallResult, RpcClientError> {
        match self.call(request, block).await {
            Ok(return_data) => {
                let gas_used = self.estimate_gas(request).await.unwrap_or(0);
                Ok(CallResult::Success {
                    gas_used,
                    logs: Vec::new(),
                    return_data: Some(return_data),
                })
            }
            Err(RpcClientError::Rpc {
                classification: RpcErrorClassification::Reverted,
                message,
                decoded_reason,
                data,
                ..
            }) => {
                let revert_data = data
                    .as_ref()
                    .and_then(Value::as_str)
                    .and_then(|s| HexData::parse(s).ok());
                Ok(CallResult::Failure {
                    gas_used: 0,
                    logs: Vec::new(),
                    error_message: decoded_reason.unwrap_or(message),
                    revert_data,
                })
            }
            Err(e) => Err(e),
        }
    }

    pub async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, RpcClientError> {
        let value = self.send("eth_getLogs", vec![filter.to_map()]).await?;
        let items = value
            .as_array()
            .ok_or_else(|| RpcClientError::abi_decoding("eth_getLogs result was not an array"))?;
        items.iter().map(parse_log).collect()
    }

    pub async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, RpcClientError> {
        let value = self.send("eth_estimateGas", vec![request.to_map()]).await?;
        parse_hex_u64(&value)
    }

    pub async fn get_transaction_count(
        &self,
        address: Address,
        block: BlockTag,
    ) -> Result<u64, RpcClientError> {
        let value = self
            .send(
                "eth_getTransactionCount",
                vec![json!(address), json!(block.to_rpc_param())],
            )
            .await?;
        parse_hex_u64(&value)
    }

    pub async fn gas_price(&self) -> Result<Wei, RpcClientError> {
        let value = self.send("eth_gasPrice", vec![]).await?;
        parse_wei(&value)
    }

    pub async fn max_priority_fee_per_gas(&self) -> Result<Wei, RpcClientError> {
        let value = self.send("eth_maxPriorityFeePerGas", vec![]).await?;
        parse_wei(&value)
    }

    pub async fn create_access_list(
        &self,
        request: &CallRequest,
        block: BlockTag,
    ) -> Result<Vec<AccessListEntry>, RpcClientError> {
        let value = self
            .send(
                "eth_createAccessList",
                vec![request.to_map(), json!(block.to_rpc_param())],
            )
            .await?;
        let list = value
            .get("accessList")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                RpcClientError::abi_decoding("eth_createAccessList response missing accessList")
            })?;
        list.iter()
            .map(|entry| {
                let address = entry
                    .get("address")
                    .and_then(Value::as_str)
                    .ok_or_else(|| RpcClientError::abi_decoding("access list entry missing address"))?;
                let keys = entry
                    .get("storageKeys")
                    .and_then(Value::as_array)
                    .map(|ks| {
                        ks.iter()
                            .filter_map(Value::as_str)
                            .map(Hash::parse)
                            .collect::<Result<Vec<_>, _>>()
                    })
                    .transpose()
                    .map_err(|e| RpcClientError::abi_decoding(e.to_string()))?
                    .unwrap_or_default();
                Ok(AccessListEntry {
                    address: Address::parse(address)
                        .map_err(|e| RpcClientError::abi_decoding(e.to_string()))?,
                    storage_keys: keys,
                })
            })
            .collect()
    }

    /// Creates a new [`crate::multicall::MulticallBatch`] bound to this
    /// client's provider.
    pub fn create_batch(&self, aggregator: Address) -> crate::multicall::MulticallBatch {
        crate::multicall::MulticallBatch::new(self.clone(), aggregator)
    }

    pub async fn subscribe_to_new_heads(
        &self,
        callback: SubscriptionCallback,
    ) -> Result<SubscriptionHandle, RpcClientError> {
        self.guard()?;
        self.provider
            .subscribe("eth_subscribe", vec![json!("newHeads")], callback)
            .await
    }

    pub async fn subscribe_to_logs(
        &self,
        filter: &LogFilter,
        callback: SubscriptionCallback,
    ) -> Result<SubscriptionHandle, RpcClientError> {
        self.guard()?;
        self.provider
            .subscribe(
                "eth_subscribe",
                vec![json!("logs"), filter.to_map()],
                callback,
            )
            .await
    }

    /// Low-level escape hatch used by [`crate::wallet`] and
    /// [`crate::multicall`] to issue calls this façade doesn't wrap directly
    /// (e.g. `eth_sendRawTransaction`).
    pub(crate) async fn raw_send(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value, RpcClientError> {
        self.send(method, params).await
    }
}

fn parse_hex_u64(value: &Value) -> Result<u64, RpcClientError> {
    let s = value
        .as_str()
        .ok_or_else(|| RpcClientError::abi_decoding("expected a hex-quantity string"))?;
    hex_fmt::decode_u64(s).map_err(|e| RpcClientError::abi_decoding(e.to_string()))
}

fn parse_wei(value: &Value) -> Result<Wei, RpcClientError> {
    let s = value
        .as_str()
        .ok_or_else(|| RpcClientError::abi_decoding("expected a hex-quantity string"))?;
    Wei::from_hex_str(s).map_err(|e| RpcClientError::abi_decoding(e.to_string()))
}

fn parse_block(value: &Value) -> Result<Block, RpcClientError> {
    let number = value
        .get("number")
        .and_then(Value::as_str)
        .ok_or_else(|| RpcClientError::abi_decoding("block missing number"))?;
    let hash = value
        .get("hash")
        .and_then(Value::as_str)
        .ok_or_else(|| RpcClientError::abi_decoding("block missing hash"))?;
    let base_fee = value
        .get("baseFeePerGas")
        .and_then(Value::as_str)
        .map(Wei::from_hex_str)
        .transpose()
        .map_err(|e| RpcClientError::abi_decoding(e.to_string()))?;
    Ok(Block {
        number: hex_fmt::decode_u64(number).map_err(|e| RpcClientError::abi_decoding(e.to_string()))?,
        hash: Hash::parse(hash).map_err(|e| RpcClientError::abi_decoding(e.to_string()))?,
        base_fee_per_gas: base_fee,
    })
}

fn parse_transaction(value: &Value) -> Result<Transaction, RpcClientError> {
    let field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| RpcClientError::abi_decoding(format!("transaction missing {name}")))
    };
    let hash = Hash::parse(field("hash")?).map_err(|e| RpcClientError::abi_decoding(e.to_string()))?;
    let from =
        Address::parse(field("from")?).map_err(|e| RpcClientError::abi_decoding(e.to_string()))?;
    let to = value
        .get("to")
        .and_then(Value::as_str)
        .map(Address::parse)
        .transpose()
        .map_err(|e| RpcClientError::abi_decoding(e.to_string()))?;
    let nonce = hex_fmt::decode_u64(field("nonce")?).map_err(|e| RpcClientError::abi_decoding(e.to_string()))?;
    let value_wei = value
        .get("value")
        .and_then(Value::as_str)
        .map(Wei::from_hex_str)
        .transpose()
        .map_err(|e| RpcClientError::abi_decoding(e.to_string()))?
        .unwrap_or(Wei::ZERO);
    Ok(Transaction {
        hash,
        from,
        to,
        nonce,
        value: value_wei,
    })
}

fn parse_receipt(value: &Value) -> Result<TransactionReceipt, RpcClientError> {
    let tx_hash = value
        .get("transactionHash")
        .and_then(Value::as_str)
        .ok_or_else(|| RpcClientError::abi_decoding("receipt missing transactionHash"))?;
    let block_number = value
        .get("blockNumber")
        .and_then(Value::as_str)
        .map(hex_fmt::decode_u64)
        .transpose()
        .map_err(|e| RpcClientError::abi_decoding(e.to_string()))?;
    let status = value
        .get("status")
        .and_then(Value::as_str)
        .map(|s| hex_fmt::decode_u64(s).map(|n| n != 0))
        .transpose()
        .map_err(|e| RpcClientError::abi_decoding(e.to_string()))?;
    let gas_used = value
        .get("gasUsed")
        .and_then(Value::as_str)
        .map(hex_fmt::decode_u64)
        .transpose()
        .map_err(|e| RpcClientError::abi_decoding(e.to_string()))?
        .unwrap_or(0);
    let logs = value
        .get("logs")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(parse_log).collect::<Result<Vec<_>, _>>())
        .transpose()?
        .unwrap_or_default();
    Ok(TransactionReceipt {
        transaction_hash: Hash::parse(tx_hash).map_err(|e| RpcClientError::abi_decoding(e.to_string()))?,
        block_number,
        status,
        gas_used,
        logs,
    })
}

fn parse_log(value: &Value) -> Result<Log, RpcClientError> {
    let address = value
        .get("address")
        .and_then(Value::as_str)
        .ok_or_else(|| RpcClientError::abi_decoding("log missing address"))?;
    let topics = value
        .get("topics")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(Hash::parse)
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()
        .map_err(|e| RpcClientError::abi_decoding(e.to_string()))?
        .unwrap_or_default();
    let data = value
        .get("data")
        .and_then(Value::as_str)
        .map(HexData::parse)
        .transpose()
        .map_err(|e| RpcClientError::abi_decoding(e.to_string()))?
        .unwrap_or_else(HexData::empty);
    Ok(Log {
        address: Address::parse(address).map_err(|e| RpcClientError::abi_decoding(e.to_string()))?,
        topics,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{FakeProvider, ScriptedResponse};

    fn client_with(fake: FakeProvider) -> PublicClient {
        PublicClient::new(Arc::new(fake))
    }

    #[tokio::test]
    async fn close_is_idempotent_and_blocks_further_calls() {
        let client = client_with(FakeProvider::new(vec![]));
        client.close();
        client.close();
        let err = client.get_chain_id().await.unwrap_err();
        assert_eq!(err.to_string(), "Client is closed");
    }

    #[tokio::test]
    async fn get_chain_id_decodes_hex_quantity() {
        let client = client_with(FakeProvider::new(vec![ScriptedResponse::ok(
            "eth_chainId",
            json!("0x1"),
        )]));
        assert_eq!(client.get_chain_id().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn get_transaction_receipt_absent_is_none() {
        let client = client_with(FakeProvider::new(vec![ScriptedResponse::ok(
            "eth_getTransactionReceipt",
            Value::Null,
        )]));
        let hash = Hash::parse(&format!("0x{}", "a".repeat(64))).unwrap();
        assert!(client.get_transaction_receipt(hash).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn simulate_call_success_carries_return_data_and_gas() {
        let client = client_with(FakeProvider::new(vec![
            ScriptedResponse::ok("eth_call", json!("0x2a")),
            ScriptedResponse::ok("eth_estimateGas", json!("0x5208")),
        ]));
        let request = CallRequest::builder().build().unwrap();
        let result = client
            .simulate_call(&request, BlockTag::Latest)
            .await
            .unwrap();
        assert!(result.is_success());
        assert_eq!(result.gas_used(), 0x5208);
        match result {
            CallResult::Success { return_data, .. } => {
                assert_eq!(return_data.unwrap().to_canonical_string(), "0x2a");
            }
            _ => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn simulate_call_revert_decodes_reason() {
        let reason_selector = [0x08, 0xc3, 0x79, 0xa0];
        let mut revert_data = reason_selector.to_vec();
        revert_data.extend(
            alloy_dyn_abi::DynSolValue::String("Unauthorized".to_string()).abi_encode_params(),
        );
        let revert_hex = HexData::from_bytes(revert_data).to_canonical_string();

        let client = client_with(FakeProvider::new(vec![ScriptedResponse::err_with_data(
            "eth_call",
            3,
            "execution reverted: Unauthorized",
            json!(revert_hex),
        )]));
        let request = CallRequest::builder().build().unwrap();
        let result = client
            .simulate_call(&request, BlockTag::Latest)
            .await
            .unwrap();
        assert!(!result.is_success());
        match result {
            CallResult::Failure { error_message, .. } => {
                assert_eq!(error_message, "Unauthorized");
            }
            _ => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn simulate_call_propagates_non_revert_errors() {
        let client = client_with(FakeProvider::new(vec![ScriptedResponse::err(
            "eth_call",
            -32000,
            "nonce too low",
        )]));
        let request = CallRequest::builder().build().unwrap();
        let err = client
            .simulate_call(&request, BlockTag::Latest)
            .await
            .unwrap_err();
        assert!(matches!(err, RpcClientError::Rpc { .. }));
    }

    #[test]
    fn receipt_into_call_result_reflects_status() {
        let receipt = TransactionReceipt {
            transaction_hash: Hash::parse(&format!("0x{}", "a".repeat(64))).unwrap(),
            block_number: Some(1),
            status: Some(false),
            gas_used: 21_000,
            logs: vec![],
        };
        let result = receipt.into_call_result();
        assert!(!result.is_success());
        assert_eq!(result.gas_used(), 21_000);
    }
}
