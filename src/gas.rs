//! Component C5: gas strategy.
//!
//! Chooses legacy vs EIP-1559 fee shape and fills in whichever fields are
//! missing from a transaction request, using the chain profile as a
//! fallback and the node as ground truth for live values. Grounded on
//! `ethers-providers`'s `fill_transaction`/`estimate_eip1559_fees`
//! (`other_examples/6afb5a29_gakonst-ethers-rs__ethers-providers-src-new_provider.rs.rs`)
//! — same two-branch legacy/1559 shape, reimplemented against this crate's
//! own `PublicClient` instead of `ethers-core`'s `TypedTransaction`.

use crate::client::PublicClient;
use crate::config::ChainProfile;
use crate::error::RpcClientError;
use crate::primitives::{BlockTag, Wei};

/// The resolved fee shape for a transaction, after gas strategy runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedFees {
    Legacy { gas_price: Wei },
    Eip1559 { max_fee_per_gas: Wei, max_priority_fee_per_gas: Wei },
}

/// Decides legacy vs EIP-1559 and fills in whatever fee fields are missing.
///
/// `requested_eip1559` is the transaction request's own `isEip1559` flag
/// when the caller expressed a preference; `None` defers to the chain
/// profile's `supports_eip1559`.
pub async fn resolve_fees(
    client: &PublicClient,
    profile: &ChainProfile,
    requested_eip1559: Option<bool>,
    gas_price: Option<Wei>,
    max_fee_per_gas: Option<Wei>,
    max_priority_fee_per_gas: Option<Wei>,
) -> Result<ResolvedFees, RpcClientError> {
    let use_eip1559 = requested_eip1559.unwrap_or(profile.supports_eip1559);

    if !use_eip1559 {
        let price = match gas_price {
            Some(p) => p,
            None => client.gas_price().await?,
        };
        return Ok(ResolvedFees::Legacy { gas_price: price });
    }

    let priority_fee = match max_priority_fee_per_gas {
        Some(fee) => fee,
        None => client
            .max_priority_fee_per_gas()
            .await
            .unwrap_or(profile.default_priority_fee_wei),
    };

    let max_fee = match max_fee_per_gas {
        Some(fee) => fee,
        None => {
            let block = client.get_block_by_number(BlockTag::Latest).await?;
            let base_fee = block.base_fee_per_gas.ok_or_else(|| {
                RpcClientError::invalid_argument("latest block has no baseFeePerGas; EIP-1559 is not active")
            })?;
            let doubled = base_fee.checked_mul_u64(2).ok_or_else(|| {
                RpcClientError::invalid_argument("base fee overflowed while computing maxFeePerGas")
            })?;
            doubled.checked_add(priority_fee).ok_or_else(|| {
                RpcClientError::invalid_argument("maxFeePerGas overflowed")
            })?
        }
    };

    Ok(ResolvedFees::Eip1559 {
        max_fee_per_gas: max_fee,
        max_priority_fee_per_gas: priority_fee,
    })
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

    #[tokio::test]
    async fn legacy_fills_gas_price_from_node() {
        let client = client_with(vec![ScriptedResponse::ok("eth_gasPrice", json!("0x3b9aca00"))]);
        let profile = ChainProfile::new(1, false, Wei::ZERO);
        let fees = resolve_fees(&client, &profile, None, None, None, None)
            .await
            .unwrap();
        assert_eq!(
            fees,
            ResolvedFees::Legacy {
                gas_price: Wei::from_hex_str("0x3b9aca00").unwrap()
            }
        );
    }

    #[tokio::test]
    async fn eip1559_derives_max_fee_from_base_fee_and_tip() {
        let client = client_with(vec![
            ScriptedResponse::ok("eth_maxPriorityFeePerGas", json!("0x1")),
            ScriptedResponse::ok(
                "eth_getBlockByNumber",
                json!({"number": "0x10", "hash": format!("0x{}", "a".repeat(64)), "baseFeePerGas": "0xa"}),
            ),
        ]);
        let profile = ChainProfile::new(1, true, Wei::from_u64(1));
        let fees = resolve_fees(&client, &profile, Some(true), None, None, None)
            .await
            .unwrap();
        assert_eq!(
            fees,
            ResolvedFees::Eip1559 {
                max_fee_per_gas: Wei::from_u64(21),
                max_priority_fee_per_gas: Wei::from_u64(1),
            }
        );
    }
}
