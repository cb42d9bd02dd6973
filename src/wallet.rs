//! Component C6: the wallet pipeline.
//!
//! Chain-id enforcement, nonce/fee/gas-limit auto-population, signing,
//! broadcast, and receipt polling — each step a distinct suspension point
//! that short-circuits on the first failure. Grounded on
//! `ethers-providers`'s `fill_transaction` (legacy/1559 branches) and the
//! pending-transaction poll loop implied by its `PendingTransaction` type.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::client::{CallRequest, PublicClient, TransactionReceipt};
use crate::config::ChainProfile;
use crate::error::RpcClientError;
use crate::gas::{self, ResolvedFees};
use crate::primitives::{Address, BlockTag, Hash, HexData, Wei};

/// A fully or partially specified transaction, ready to be completed by the
/// wallet pipeline.
#[derive(Debug, Clone, Default)]
pub struct TransactionRequest {
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub value: Option<Wei>,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<Wei>,
    pub max_fee_per_gas: Option<Wei>,
    pub max_priority_fee_per_gas: Option<Wei>,
    pub nonce: Option<u64>,
    pub data: Option<HexData>,
    pub is_eip1559: Option<bool>,
    pub access_list: Option<Vec<crate::client::AccessListEntry>>,
}

impl TransactionRequest {
    pub fn validate(&self) -> Result<(), RpcClientError> {
        let has_1559 = self.max_fee_per_gas.is_some() || self.max_priority_fee_per_gas.is_some();
        if self.gas_price.is_some() && has_1559 {
            return Err(RpcClientError::invalid_argument(
                "gasPrice is mutually exclusive with maxFeePerGas/maxPriorityFeePerGas",
            ));
        }
        Ok(())
    }
}

/// The fully populated transaction handed to the signer, after the wallet
/// pipeline has filled in every field it's responsible for.
#[derive(Debug, Clone)]
pub struct UnsignedTransaction {
    pub chain_id: u64,
    pub from: Address,
    pub to: Option<Address>,
    pub value: Wei,
    pub nonce: u64,
    pub gas_limit: u64,
    pub fees: ResolvedFees,
    pub data: HexData,
    pub access_list: Vec<crate::client::AccessListEntry>,
}

/// An opaque signing capability: takes a fully populated transaction and the
/// chain id, returns the raw hex-encoded transaction ready for
/// `eth_sendRawTransaction`.
///
/// The concrete transaction shape passed in is implementation-defined by
/// design; what matters is the output is exactly the wire-format raw
/// transaction.
#[async_trait]
pub trait Signer: Send + Sync {
    fn address(&self) -> Address;
    async fn sign_transaction(&self, tx: &UnsignedTransaction) -> Result<HexData, RpcClientError>;
}

/// A [`Signer`] backed by a local private key, using `alloy-signer-local` for
/// the underlying secp256k1 signature and `alloy-consensus` for RLP encoding
/// of the signed envelope — both explicitly out of scope for this crate to
/// reimplement.
pub struct LocalSigner {
    inner: alloy_signer_local::PrivateKeySigner,
}

impl LocalSigner {
    pub fn from_signer(inner: alloy_signer_local::PrivateKeySigner) -> Self {
        Self { inner }
    }

    pub fn random() -> Self {
        Self {
            inner: alloy_signer_local::PrivateKeySigner::random(),
        }
    }
}

#[async_trait]
impl Signer for LocalSigner {
    fn address(&self) -> Address {
        use alloy_signer::Signer as _;
        Address::from(self.inner.address())
    }

    async fn sign_transaction(&self, tx: &UnsignedTransaction) -> Result<HexData, RpcClientError> {
        use alloy_consensus::{Encodable2718, SignableTransaction, TxEip1559, TxLegacy};
        use alloy_primitives::{Bytes, TxKind, U256};
        use alloy_signer::Signer as _;

        let to = match tx.to {
            Some(addr) => TxKind::Call(addr.into()),
            None => TxKind::Create,
        };
        let input: Bytes = tx.data.as_bytes().to_vec().into();

        let encoded: Vec<u8> = match tx.fees {
            ResolvedFees::Legacy { gas_price } => {
                let mut unsigned = TxLegacy {
                    chain_id: Some(tx.chain_id),
                    nonce: tx.nonce,
                    gas_price: gas_price.as_u256().to::<u128>(),
                    gas_limit: tx.gas_limit,
                    to,
                    value: U256::from_be_bytes(tx.value.as_u256().to_be_bytes()),
                    input,
                };
                let signature = self
                    .inner
                    .sign_transaction(&mut unsigned)
                    .await
                    .map_err(|e| RpcClientError::invalid_argument(format!("signing failed: {e}")))?;
                let signed = unsigned.into_signed(signature);
                signed.encoded_2718()
            }
            ResolvedFees::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => {
                let mut unsigned = TxEip1559 {
                    chain_id: tx.chain_id,
                    nonce: tx.nonce,
                    gas_limit: tx.gas_limit,
                    max_fee_per_gas: max_fee_per_gas.as_u256().to::<u128>(),
                    max_priority_fee_per_gas: max_priority_fee_per_gas.as_u256().to::<u128>(),
                    to,
                    value: U256::from_be_bytes(tx.value.as_u256().to_be_bytes()),
                    access_list: Default::default(),
                    input,
                };
                let signature = self
                    .inner
                    .sign_transaction(&mut unsigned)
                    .await
                    .map_err(|e| RpcClientError::invalid_argument(format!("signing failed: {e}")))?;
                let signed = unsigned.into_signed(signature);
                signed.encoded_2718()
            }
        };

        Ok(HexData::from_bytes(encoded))
    }
}

/// Coordinates chain-id enforcement, auto-population, signing, and
/// broadcast.
pub struct Wallet {
    client: PublicClient,
    signer: std::sync::Arc<dyn Signer>,
    chain_id: u64,
    chain_profile: ChainProfile,
}

impl Wallet {
    pub fn new(
        client: PublicClient,
        signer: std::sync::Arc<dyn Signer>,
        chain_id: u64,
        chain_profile: ChainProfile,
    ) -> Self {
        Self {
            client,
            signer,
            chain_id,
            chain_profile,
        }
    }

    /// Runs the full pipeline, returning the
    /// broadcast transaction hash.
    pub async fn send_transaction(&self, request: TransactionRequest) -> Result<Hash, RpcClientError> {
        request.validate()?;

        // Step 1: chain guard.
        let actual_chain_id = self.client.get_chain_id().await?;
        if actual_chain_id != self.chain_id {
            return Err(RpcClientError::ChainMismatch {
                expected: self.chain_id,
                actual: actual_chain_id,
            });
        }

        let from = request.from.unwrap_or_else(|| self.signer.address());

        // Step 2: fill nonce.
        let nonce = match request.nonce {
            Some(n) => n,
            None => {
                self.client
                    .get_transaction_count(from, BlockTag::Pending)
                    .await?
            }
        };

        // Step 3: fill fees.
        let fees = gas::resolve_fees(
            &self.client,
            &self.chain_profile,
            request.is_eip1559,
            request.gas_price,
            request.max_fee_per_gas,
            request.max_priority_fee_per_gas,
        )
        .await?;

        // Step 4: fill gas limit.
        let gas_limit = match request.gas_limit {
            Some(limit) => limit,
            None => {
                let mut builder = CallRequest::builder().from_address(from);
                if let Some(to) = request.to {
                    builder = builder.to(to);
                }
                if let Some(value) = request.value {
                    builder = builder.value(value);
                }
                if let Some(data) = request.data.clone() {
                    builder = builder.data(data);
                }
                let call_request = builder.build()?;
                self.client.estimate_gas(&call_request).await?
            }
        };

        let unsigned = UnsignedTransaction {
            chain_id: self.chain_id,
            from,
            to: request.to,
            value: request.value.unwrap_or(Wei::ZERO),
            nonce,
            gas_limit,
            fees,
            data: request.data.unwrap_or_else(HexData::empty),
            access_list: request.access_list.unwrap_or_default(),
        };

        // Step 5: sign.
        let raw = self.signer.sign_transaction(&unsigned).await?;

        // Step 6: broadcast.
        let result = self
            .client
            .raw_send("eth_sendRawTransaction", vec![json!(raw)])
            .await?;
        let hash_str = result
            .as_str()
            .ok_or_else(|| RpcClientError::abi_decoding("eth_sendRawTransaction did not return a hash"))?;
        Hash::parse(hash_str).map_err(|e| RpcClientError::abi_decoding(e.to_string()))
    }

    /// Sends and polls for a mined receipt at `poll_interval_ms` (a lower
    /// bound), timing out after `timeout_ms`.
    pub async fn send_transaction_and_wait(
        &self,
        request: TransactionRequest,
        timeout_ms: u64,
        poll_interval_ms: u64,
    ) -> Result<TransactionReceipt, RpcClientError> {
        let hash = self.send_transaction(request).await?;
        let poll = async {
            loop {
                if let Some(receipt) = self.client.get_transaction_receipt(hash).await? {
                    if receipt.block_number.is_some() {
                        return Ok(receipt);
                    }
                }
                tokio::time::sleep(Duration::from_millis(poll_interval_ms)).await;
            }
        };

        match tokio::time::timeout(Duration::from_millis(timeout_ms), poll).await {
            Ok(result) => result,
            Err(_) => Err(RpcClientError::Timeout {
                operation: "sendTransactionAndWait".to_string(),
                elapsed_ms: timeout_ms,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{FakeProvider, ScriptedResponse};
    use serde_json::json;
    use std::sync::Arc;

    struct StubSigner {
        address: Address,
    }

    #[async_trait]
    impl Signer for StubSigner {
        fn address(&self) -> Address {
            self.address
        }

        async fn sign_transaction(&self, tx: &UnsignedTransaction) -> Result<HexData, RpcClientError> {
            assert_eq!(tx.nonce, 5);
            assert_eq!(tx.gas_limit, 0x5208);
            HexData::parse(&format!("0x{}", "a".repeat(64)))
                .map_err(|e| RpcClientError::abi_decoding(e.to_string()))
        }
    }

    #[tokio::test]
    async fn scenario_s1_legacy_send() {
        // scenario S1.
        let from = Address::parse("0x1111111111111111111111111111111111111111").unwrap();
        let to = Address::parse("0x2222222222222222222222222222222222222222").unwrap();

        let client = PublicClient::new(Arc::new(FakeProvider::new(vec![
            ScriptedResponse::ok("eth_chainId", json!("0x1")),
            ScriptedResponse::ok("eth_getTransactionCount", json!("0x5")),
            ScriptedResponse::ok("eth_estimateGas", json!("0x5208")),
            ScriptedResponse::ok(
                "eth_sendRawTransaction",
                json!(format!("0x{}", "a".repeat(64))),
            ),
        ])));

        let wallet = Wallet::new(
            client,
            Arc::new(StubSigner { address: from }),
            1,
            ChainProfile::new(1, false, Wei::ZERO),
        );

        let request = TransactionRequest {
            from: Some(from),
            to: Some(to),
            value: Some(Wei::ZERO),
            gas_price: Some(Wei::from_hex_str("0x3b9aca00").unwrap()),
            data: Some(HexData::empty()),
            ..Default::default()
        };

        let hash = wallet.send_transaction(request).await.unwrap();
        assert_eq!(hash.to_string(), format!("0x{}", "a".repeat(64)));
    }

    #[tokio::test]
    async fn chain_mismatch_short_circuits_before_signing() {
        let from = Address::parse("0x1111111111111111111111111111111111111111").unwrap();
        let client = PublicClient::new(Arc::new(FakeProvider::new(vec![ScriptedResponse::ok(
            "eth_chainId",
            json!("0x2"),
        )])));
        let wallet = Wallet::new(
            client,
            Arc::new(StubSigner { address: from }),
            1,
            ChainProfile::new(1, false, Wei::ZERO),
        );
        let err = wallet
            .send_transaction(TransactionRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RpcClientError::ChainMismatch { expected: 1, actual: 2 }));
    }
}
