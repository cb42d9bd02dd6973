//! A typed, transport-agnostic JSON-RPC client for Ethereum-compatible
//! execution layers: provider transports, a typed RPC façade, gas strategy,
//! a wallet pipeline, a multicall batch engine, and a test-node controller.

pub mod client;
pub mod config;
pub mod error;
pub mod gas;
pub mod multicall;
pub mod primitives;
pub mod provider;
pub mod rpc;
pub mod testnode;
pub mod wallet;

pub use client::PublicClient;
pub use config::{ChainProfile, ClientConfig};
pub use error::{RpcClientError, RpcErrorClassification};
pub use primitives::{Address, BlockTag, Hash, HexData, Wei};
pub use provider::{FakeProvider, HttpProvider, Provider, WebSocketConfig, WsProvider};
