//! Component C7: the multicall batch engine.
//!
//! The original source records calls through a dynamic proxy over a
//! user-declared interface. This builds on the alternative of an explicit
//! builder — each call explicit, `batch.call(target, function, args) ->
//! BatchHandle` — which
//! keeps the ABI as data and makes orphan detection structurally unnecessary:
//! there is no "invoke before add" state to get wrong because recording and
//! adding are the same call. Grounded on the aggregator-calling shape in
//! `other_examples` Multicall3 usage and this crate's own
//! `error::decode_error_string_selector` for revert decoding.

mod handle;

pub use handle::{BatchHandle, BatchResult};

use alloy_dyn_abi::{DynSolType, DynSolValue, Specifier};
use alloy_json_abi::{Function, StateMutability};
use alloy_primitives::keccak256;

use crate::client::{CallRequest, PublicClient};
use crate::error::RpcClientError;
use crate::primitives::{Address, BlockTag, HexData};

use handle::Slot;

const DEFAULT_CHUNK_SIZE: usize = 100;
const MAX_CHUNK_SIZE: usize = 1000;

struct PendingCall {
    target: Address,
    call_data: Vec<u8>,
    output_types: Vec<DynSolType>,
    slot: std::sync::Arc<Slot>,
}

/// Accumulates view calls against an on-chain Multicall3-compatible
/// aggregator, then dispatches them in chunks through `eth_call`.
///
/// Not thread-safe: exactly one task should interact with a batch from
/// creation through `execute()`.
pub struct MulticallBatch {
    client: PublicClient,
    aggregator: Address,
    chunk_size: usize,
    pending: Vec<PendingCall>,
    executed: bool,
}

impl MulticallBatch {
    pub(crate) fn new(client: PublicClient, aggregator: Address) -> Self {
        Self {
            client,
            aggregator,
            chunk_size: DEFAULT_CHUNK_SIZE,
            pending: Vec::new(),
            executed: false,
        }
    }

    /// Sets the chunk size. Accepts `1..=1000`, rejects larger.
    pub fn chunk_size(mut self, n: usize) -> Result<Self, RpcClientError> {
        if n == 0 || n > MAX_CHUNK_SIZE {
            return Err(RpcClientError::invalid_argument(format!(
                "chunk size must be between 1 and {MAX_CHUNK_SIZE}, got {n}"
            )));
        }
        self.chunk_size = n;
        Ok(self)
    }

    /// Records one view call, encoding `selector || abi_encode(args)` against
    /// `function`'s declared inputs. Rejects non-view/pure methods.
    pub fn call(
        &mut self,
        target: Address,
        function: &Function,
        args: &[DynSolValue],
    ) -> Result<BatchHandle, RpcClientError> {
        if self.executed {
            return Err(RpcClientError::illegal_state(
                "batch has already been executed",
            ));
        }
        if !matches!(
            function.state_mutability,
            StateMutability::View | StateMutability::Pure
        ) {
            return Err(RpcClientError::invalid_argument(format!(
                "{} is not a view method",
                function.name
            )));
        }

        let selector = function.selector();
        let mut call_data = selector.to_vec();
        call_data.extend(DynSolValue::Tuple(args.to_vec()).abi_encode_params());

        let output_types = function
            .outputs
            .iter()
            .map(|p| {
                p.resolve().map_err(|e| {
                    RpcClientError::abi_decoding(format!("unresolvable output type: {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let slot = Slot::new();
        self.pending.push(PendingCall {
            target,
            call_data,
            output_types,
            slot: slot.clone(),
        });
        Ok(BatchHandle::new(slot))
    }

    /// Dispatches the accumulated calls in chunks of `chunk_size`, resolving
    /// every handle in place. Idempotent: a second call fails. Zero calls issues zero RPCs.
    pub async fn execute(&mut self) -> Result<(), RpcClientError> {
        if self.executed {
            return Err(RpcClientError::illegal_state(
                "batch has already been executed",
            ));
        }
        self.executed = true;

        if self.pending.is_empty() {
            return Ok(());
        }

        for chunk in self.pending.chunks(self.chunk_size).collect::<Vec<_>>() {
            let call_data = encode_aggregate3(chunk);
            let request = CallRequest::builder()
                .to(self.aggregator)
                .data(HexData::from_bytes(call_data))
                .build()?;
            let result = self.client.call(&request, BlockTag::Latest).await?;
            if result.is_empty() {
                return Err(RpcClientError::abi_decoding(
                    "aggregator returned empty data: contract not deployed",
                ));
            }
            let decoded = decode_aggregate3_result(result.as_bytes())?;
            if decoded.len() != chunk.len() {
                return Err(RpcClientError::abi_decoding(format!(
                    "aggregator returned {} results for {} calls",
                    decoded.len(),
                    chunk.len()
                )));
            }
            for (pending, (success, return_data)) in chunk.iter().zip(decoded) {
                let result = if success {
                    let tuple_type = DynSolType::Tuple(pending.output_types.clone());
                    let decoded_value = tuple_type.abi_decode_params(&return_data).map_err(|e| {
                        RpcClientError::abi_decoding(format!("output decode failed: {e}"))
                    })?;
                    BatchResult {
                        success: true,
                        data: Some(decoded_value),
                        revert_reason: None,
                    }
                } else {
                    let revert_reason = crate::error::decode_error_string_selector(
                        &HexData::from_bytes(return_data).to_canonical_string(),
                    );
                    BatchResult {
                        success: false,
                        data: None,
                        revert_reason,
                    }
                };
                pending.slot.resolve(result);
            }
        }

        Ok(())
    }
}

fn encode_aggregate3(chunk: &[PendingCall]) -> Vec<u8> {
    let selector = keccak256(b"aggregate3((address,bool,bytes)[])");
    let calls = chunk
        .iter()
        .map(|call| {
            DynSolValue::Tuple(vec![
                DynSolValue::Address(call.target.into()),
                DynSolValue::Bool(true),
                DynSolValue::Bytes(call.call_data.clone()),
            ])
        })
        .collect();
    let mut data = selector[0..4].to_vec();
    data.extend(DynSolValue::Tuple(vec![DynSolValue::Array(calls)]).abi_encode_params());
    data
}

fn decode_aggregate3_result(data: &[u8]) -> Result<Vec<(bool, Vec<u8>)>, RpcClientError> {
    let result_type = DynSolType::Array(Box::new(DynSolType::Tuple(vec![
        DynSolType::Bool,
        DynSolType::Bytes,
    ])));
    let tuple_type = DynSolType::Tuple(vec![result_type]);
    let decoded = tuple_type
        .abi_decode_params(data)
        .map_err(|e| RpcClientError::abi_decoding(format!("aggregate3 result decode failed: {e}")))?;
    let DynSolValue::Tuple(mut outer) = decoded else {
        return Err(RpcClientError::abi_decoding(
            "aggregate3 result was not the expected tuple shape",
        ));
    };
    let array = outer.remove(0);
    let DynSolValue::Array(items) = array else {
        return Err(RpcClientError::abi_decoding(
            "aggregate3 result was not an array",
        ));
    };
    items
        .into_iter()
        .map(|item| {
            let DynSolValue::Tuple(mut fields) = item else {
                return Err(RpcClientError::abi_decoding(
                    "aggregate3 entry was not a (bool, bytes) tuple",
                ));
            };
            let return_data = fields.pop();
            let success = fields.pop();
            match (success, return_data) {
                (Some(DynSolValue::Bool(success)), Some(DynSolValue::Bytes(bytes))) => {
                    Ok((success, bytes))
                }
                _ => Err(RpcClientError::abi_decoding(
                    "aggregate3 entry had unexpected field types",
                )),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{FakeProvider, ScriptedResponse};
    use serde_json::json;
    use std::sync::Arc;

    fn client_with(scripted: Vec<ScriptedResponse>) -> PublicClient {
        PublicClient::new(Arc::new(FakeProvider::new(scripted)))
    }

    fn balance_of() -> Function {
        serde_json::from_value(json!({
            "type": "function",
            "name": "balanceOf",
            "inputs": [{"name": "owner", "type": "address"}],
            "outputs": [{"name": "", "type": "uint256"}],
            "stateMutability": "view"
        }))
        .unwrap()
    }

    #[test]
    fn rejects_chunk_size_above_max() {
        let client = client_with(vec![]);
        let batch = MulticallBatch::new(client, Address::parse("0x1111111111111111111111111111111111111111").unwrap());
        assert!(batch.chunk_size(1001).is_err());
    }

    #[test]
    fn rejects_non_view_method() {
        let client = client_with(vec![]);
        let mut batch = MulticallBatch::new(
            client,
            Address::parse("0x1111111111111111111111111111111111111111").unwrap(),
        );
        let mut transfer: Function = balance_of();
        transfer.state_mutability = StateMutability::NonPayable;
        let owner = Address::parse("0x2222222222222222222222222222222222222222").unwrap();
        let result = batch.call(owner, &transfer, &[DynSolValue::Address(owner.into())]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn execute_is_idempotent() {
        let selector = keccak256(b"aggregate3((address,bool,bytes)[])");
        let mut payload = selector[0..4].to_vec();
        payload.extend(
            DynSolValue::Tuple(vec![DynSolValue::Array(vec![])]).abi_encode_params(),
        );
        let _ = payload;

        let client = client_with(vec![]);
        let mut batch = MulticallBatch::new(
            client,
            Address::parse("0x1111111111111111111111111111111111111111").unwrap(),
        );
        // N = 0: execute() must succeed with zero RPCs, then refuse a second call.
        batch.execute().await.unwrap();
        assert!(batch.execute().await.unwrap_err().to_string().contains("already been executed"));
    }

    #[tokio::test]
    async fn scenario_s2_revert_decoding() {
        // scenario S2: a single failed call whose returnData decodes
        // to the revert string "Unauthorized".
        let reason_selector = [0x08, 0xc3, 0x79, 0xa0];
        let mut revert_data = reason_selector.to_vec();
        revert_data.extend(DynSolValue::String("Unauthorized".to_string()).abi_encode_params());

        let aggregate_result = DynSolValue::Tuple(vec![DynSolValue::Array(vec![
            DynSolValue::Tuple(vec![
                DynSolValue::Bool(false),
                DynSolValue::Bytes(revert_data),
            ]),
        ])])
        .abi_encode_params();

        let client = client_with(vec![ScriptedResponse::ok(
            "eth_call",
            json!(HexData::from_bytes(aggregate_result).to_canonical_string()),
        )]);
        let mut batch = MulticallBatch::new(
            client,
            Address::parse("0x1111111111111111111111111111111111111111").unwrap(),
        );
        let owner = Address::parse("0x2222222222222222222222222222222222222222").unwrap();
        let handle = batch
            .call(owner, &balance_of(), &[DynSolValue::Address(owner.into())])
            .unwrap();

        batch.execute().await.unwrap();

        let result = handle.result().unwrap();
        assert!(!result.success);
        assert_eq!(result.data.is_none(), true);
        assert_eq!(result.revert_reason.as_deref(), Some("Unauthorized"));
    }
}
