//! Request/response shapes for [`super::PublicClient`].

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::error::RpcClientError;
use crate::primitives::{hex_fmt, Address, BlockTag, Hash, HexData, Wei};

/// EIP-2930 access list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessListEntry {
    pub address: Address,
    pub storage_keys: Vec<Hash>,
}

impl AccessListEntry {
    fn to_json(&self) -> Value {
        json!({
            "address": self.address,
            "storageKeys": self.storage_keys,
        })
    }
}

/// Fee-related fields shared by [`CallRequest`] and the wallet's transaction
/// request, including the mutual-exclusivity invariant: `gasPrice` is
/// mutually exclusive with either EIP-1559 field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GasFields {
    pub gas_price: Option<Wei>,
    pub max_fee_per_gas: Option<Wei>,
    pub max_priority_fee_per_gas: Option<Wei>,
    pub is_eip1559: bool,
}

impl GasFields {
    pub fn validate(&self) -> Result<(), RpcClientError> {
        let has_1559_field = self.max_fee_per_gas.is_some() || self.max_priority_fee_per_gas.is_some();
        if self.gas_price.is_some() && has_1559_field {
            return Err(RpcClientError::invalid_argument(
                "gasPrice is mutually exclusive with maxFeePerGas/maxPriorityFeePerGas",
            ));
        }
        Ok(())
    }
}

/// A read-only (`eth_call`) request: the transaction-request shape minus
/// nonce/signing fields, plus optional state overrides.
#[derive(Debug, Clone)]
pub struct CallRequest {
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub value: Option<Wei>,
    pub gas_limit: Option<u64>,
    pub gas: GasFields,
    pub data: Option<HexData>,
    pub access_list: Option<Vec<AccessListEntry>>,
    pub state_overrides: Option<BTreeMap<Address, AccountOverride>>,
}

impl CallRequest {
    pub fn builder() -> CallRequestBuilder {
        CallRequestBuilder::default()
    }

    /// Serializes to the call-object map used by `eth_call` /
    /// `eth_estimateGas` / `eth_createAccessList`. The returned value is a
    /// fresh copy; mutating it never affects `self`.
    pub fn to_map(&self) -> Value {
        let mut map = serde_json::Map::new();
        if let Some(from) = &self.from {
            map.insert("from".into(), json!(from));
        }
        if let Some(to) = &self.to {
            map.insert("to".into(), json!(to));
        }
        if let Some(value) = &self.value {
            map.insert("value".into(), json!(value));
        }
        if let Some(gas_limit) = self.gas_limit {
            map.insert("gas".into(), json!(hex_fmt::encode_u64(gas_limit)));
        }
        if let Some(gas_price) = &self.gas.gas_price {
            map.insert("gasPrice".into(), json!(gas_price));
        }
        if let Some(max_fee) = &self.gas.max_fee_per_gas {
            map.insert("maxFeePerGas".into(), json!(max_fee));
        }
        if let Some(tip) = &self.gas.max_priority_fee_per_gas {
            map.insert("maxPriorityFeePerGas".into(), json!(tip));
        }
        if let Some(data) = &self.data {
            map.insert("data".into(), json!(data));
        }
        if let Some(access_list) = &self.access_list {
            if !access_list.is_empty() {
                let entries: Vec<Value> = access_list.iter().map(AccessListEntry::to_json).collect();
                map.insert("accessList".into(), Value::Array(entries));
            }
        }
        Value::Object(map)
    }

    /// Serializes `stateOverrides` keyed by address to the map the node
    /// expects for `eth_call`'s third positional parameter.
    pub fn state_overrides_map(&self) -> Option<Value> {
        let overrides = self.state_overrides.as_ref()?;
        if overrides.is_empty() {
            return None;
        }
        let mut map = serde_json::Map::new();
        for (address, over) in overrides {
            map.insert(address.to_string(), over.to_map());
        }
        Some(Value::Object(map))
    }
}

/// Builder for [`CallRequest`]; validates the gas-field invariant at `build`.
#[derive(Debug, Clone, Default)]
pub struct CallRequestBuilder {
    inner: CallRequest,
}

impl Default for CallRequest {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            value: None,
            gas_limit: None,
            gas: GasFields::default(),
            data: None,
            access_list: None,
            state_overrides: None,
        }
    }
}

impl CallRequestBuilder {
    pub fn from_address(mut self, from: Address) -> Self {
        self.inner.from = Some(from);
        self
    }
    pub fn to(mut self, to: Address) -> Self {
        self.inner.to = Some(to);
        self
    }
    pub fn value(mut self, value: Wei) -> Self {
        self.inner.value = Some(value);
        self
    }
    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.inner.gas_limit = Some(gas_limit);
        self
    }
    pub fn gas_price(mut self, gas_price: Wei) -> Self {
        self.inner.gas.gas_price = Some(gas_price);
        self
    }
    pub fn max_fee_per_gas(mut self, value: Wei) -> Self {
        self.inner.gas.max_fee_per_gas = Some(value);
        self
    }
    pub fn max_priority_fee_per_gas(mut self, value: Wei) -> Self {
        self.inner.gas.max_priority_fee_per_gas = Some(value);
        self
    }
    pub fn is_eip1559(mut self, is_eip1559: bool) -> Self {
        self.inner.gas.is_eip1559 = is_eip1559;
        self
    }
    pub fn data(mut self, data: HexData) -> Self {
        self.inner.data = Some(data);
        self
    }
    pub fn access_list(mut self, access_list: Vec<AccessListEntry>) -> Self {
        self.inner.access_list = Some(access_list);
        self
    }
    pub fn state_override(mut self, address: Address, over: AccountOverride) -> Self {
        self.inner
            .state_overrides
            .get_or_insert_with(BTreeMap::new)
            .insert(address, over);
        self
    }

    pub fn build(self) -> Result<CallRequest, RpcClientError> {
        self.inner.gas.validate()?;
        Ok(self.inner)
    }
}

/// A per-account state override for `eth_call`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountOverride {
    pub balance: Option<Wei>,
    pub nonce: Option<u64>,
    pub code: Option<HexData>,
    state_diff: BTreeMap<Hash, Hash>,
}

impl AccountOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(mut self, balance: Wei) -> Self {
        self.balance = Some(balance);
        self
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn with_code(mut self, code: HexData) -> Self {
        self.code = Some(code);
        self
    }

    /// Defensively copies `state_diff` so later mutation of the caller's map
    /// cannot affect this override.
    pub fn with_state_diff(mut self, state_diff: BTreeMap<Hash, Hash>) -> Self {
        self.state_diff = state_diff;
        self
    }

    /// Read-only view of the stored state diff.
    pub fn state_diff(&self) -> &BTreeMap<Hash, Hash> {
        &self.state_diff
    }

    /// Serializes to the wire map. `stateDiff` is omitted when null or empty.
    pub fn to_map(&self) -> Value {
        let mut map = serde_json::Map::new();
        if let Some(balance) = &self.balance {
            map.insert("balance".into(), json!(balance));
        }
        if let Some(nonce) = self.nonce {
            map.insert("nonce".into(), json!(hex_fmt::encode_u64(nonce)));
        }
        if let Some(code) = &self.code {
            map.insert("code".into(), json!(code));
        }
        if !self.state_diff.is_empty() {
            let mut diff = serde_json::Map::new();
            for (k, v) in &self.state_diff {
                diff.insert(k.to_string(), json!(v));
            }
            map.insert("stateDiff".into(), Value::Object(diff));
        }
        Value::Object(map)
    }
}

/// A topic filter slot: a single hash, a list of hashes (OR), or a wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicFilter {
    Single(Hash),
    Any(Vec<Hash>),
    Wildcard,
}

impl TopicFilter {
    fn to_json(&self) -> Value {
        match self {
            TopicFilter::Single(h) => json!(h),
            TopicFilter::Any(hashes) => Value::Array(hashes.iter().map(|h| json!(h)).collect()),
            TopicFilter::Wildcard => Value::Null,
        }
    }
}

/// `eth_getLogs` filter.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub from_block: Option<BlockTag>,
    pub to_block: Option<BlockTag>,
    pub addresses: Vec<Address>,
    pub topics: Vec<TopicFilter>,
}

impl LogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes address as scalar when exactly one, array otherwise,
    /// omitted when empty; `fromBlock`/`toBlock` as minimal hex.
    pub fn to_map(&self) -> Value {
        let mut map = serde_json::Map::new();
        if let Some(from) = self.from_block {
            map.insert("fromBlock".into(), json!(from.to_rpc_param()));
        }
        if let Some(to) = self.to_block {
            map.insert("toBlock".into(), json!(to.to_rpc_param()));
        }
        match self.addresses.as_slice() {
            [] => {}
            [single] => {
                map.insert("address".into(), json!(single));
            }
            many => {
                map.insert(
                    "address".into(),
                    Value::Array(many.iter().map(|a| json!(a)).collect()),
                );
            }
        }
        if !self.topics.is_empty() {
            let topics: Vec<Value> = self.topics.iter().map(TopicFilter::to_json).collect();
            map.insert("topics".into(), Value::Array(topics));
        }
        Value::Object(map)
    }
}

/// A decoded event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<Hash>,
    pub data: HexData,
}

/// The outcome of a simulated or executed call.
#[derive(Debug, Clone)]
pub enum CallResult {
    Success {
        gas_used: u64,
        logs: Vec<Log>,
        return_data: Option<HexData>,
    },
    Failure {
        gas_used: u64,
        logs: Vec<Log>,
        error_message: String,
        revert_data: Option<HexData>,
    },
}

impl CallResult {
    pub fn gas_used(&self) -> u64 {
        match self {
            CallResult::Success { gas_used, .. } => *gas_used,
            CallResult::Failure { gas_used, .. } => *gas_used,
        }
    }

    pub fn logs(&self) -> &[Log] {
        match self {
            CallResult::Success { logs, .. } => logs,
            CallResult::Failure { logs, .. } => logs,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CallResult::Success { .. })
    }
}

/// Minimal block read model.
#[derive(Debug, Clone)]
pub struct Block {
    pub number: u64,
    pub hash: Hash,
    pub base_fee_per_gas: Option<Wei>,
}

/// Minimal transaction read model.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub hash: Hash,
    pub from: Address,
    pub to: Option<Address>,
    pub nonce: u64,
    pub value: Wei,
}

/// Minimal transaction receipt read model.
#[derive(Debug, Clone)]
pub struct TransactionReceipt {
    pub transaction_hash: Hash,
    pub block_number: Option<u64>,
    pub status: Option<bool>,
    pub gas_used: u64,
    pub logs: Vec<Log>,
}

impl TransactionReceipt {
    /// Converts a mined receipt into a [`CallResult`]. A pre-Byzantium
    /// receipt (`status: None`) is reported as a success, matching those
    /// chains' absence of a status field rather than a known failure.
    pub fn into_call_result(self) -> CallResult {
        if self.status.unwrap_or(true) {
            CallResult::Success {
                gas_used: self.gas_used,
                logs: self.logs,
                return_data: None,
            }
        } else {
            CallResult::Failure {
                gas_used: self.gas_used,
                logs: self.logs,
                error_message: "transaction reverted".to_string(),
                revert_data: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_request_rejects_mixed_gas_fields() {
        let result = CallRequest::builder()
            .gas_price(Wei::from_u64(1))
            .max_fee_per_gas(Wei::from_u64(2))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn call_request_to_map_is_a_fresh_copy() {
        let req = CallRequest::builder().value(Wei::from_u64(5)).build().unwrap();
        let mut map = req.to_map();
        map.as_object_mut().unwrap().insert("extra".into(), json!(1));
        // Rebuilding from `req` must not see the mutation above.
        assert!(!req.to_map().as_object().unwrap().contains_key("extra"));
    }

    #[test]
    fn account_override_omits_empty_state_diff() {
        let over = AccountOverride::new().with_balance(Wei::from_u64(1000));
        let map = over.to_map();
        assert!(!map.as_object().unwrap().contains_key("stateDiff"));
    }

    #[test]
    fn account_override_serialization_scenario_s3() {
        let mut diff = BTreeMap::new();
        diff.insert(
            Hash::parse(&format!("0x{}", "a".repeat(64))).unwrap(),
            Hash::parse(&format!("0x{}", "b".repeat(64))).unwrap(),
        );
        let over = AccountOverride::new()
            .with_balance(Wei::from_u64(1000))
            .with_nonce(42)
            .with_code(HexData::parse("0x1234").unwrap())
            .with_state_diff(diff);
        let map = over.to_map();
        assert_eq!(map["balance"], json!("0x3e8"));
        assert_eq!(map["nonce"], json!("0x2a"));
        assert_eq!(map["code"], json!("0x1234"));
        assert_eq!(
            map["stateDiff"][format!("0x{}", "a".repeat(64))],
            json!(format!("0x{}", "b".repeat(64)))
        );
    }

    #[test]
    fn log_filter_address_scalar_vs_array() {
        let addr1 = Address::parse("0x1111111111111111111111111111111111111111").unwrap();
        let addr2 = Address::parse("0x2222222222222222222222222222222222222222").unwrap();

        let mut single = LogFilter::new();
        single.addresses = vec![addr1];
        assert_eq!(single.to_map()["address"], json!(addr1));

        let mut many = LogFilter::new();
        many.addresses = vec![addr1, addr2];
        assert!(many.to_map()["address"].is_array());

        let empty = LogFilter::new();
        assert!(!empty.to_map().as_object().unwrap().contains_key("address"));
    }
}
