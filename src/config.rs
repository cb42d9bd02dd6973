//! Ambient configuration surface: the chain-profile and client-config shapes
//! the core needs from its caller, without the chain catalog or CLI glue
//! that produce them. Grounded on the `Network`-keyed `is_eip1559` table in
//! `provider_cache.rs::from_env` and the `Config`/`CliArgs` split.

use std::time::Duration;

use url::Url;

use crate::error::RpcClientError;
use crate::primitives::Wei;

/// The minimal per-chain facts the gas strategy needs. Which
/// networks exist and their well-known names is the chain catalog, which is
/// out of scope here; callers supply one profile for the chain they target.
#[derive(Debug, Clone, Copy)]
pub struct ChainProfile {
    pub chain_id: u64,
    pub supports_eip1559: bool,
    /// Fallback priority fee used when the node has no
    /// `eth_maxPriorityFeePerGas` method.
    pub default_priority_fee_wei: Wei,
}

impl ChainProfile {
    pub fn new(chain_id: u64, supports_eip1559: bool, default_priority_fee_wei: Wei) -> Self {
        Self {
            chain_id,
            supports_eip1559,
            default_priority_fee_wei,
        }
    }
}

/// How a `PublicClient` should be constructed: the endpoint, the request
/// timeout, and whether debug tracing is forced on regardless of
/// `BRANE_DEBUG`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: Url,
    pub request_timeout: Duration,
    pub force_debug_tracing: bool,
}

impl ClientConfig {
    pub fn builder(endpoint: &str) -> Result<ClientConfigBuilder, RpcClientError> {
        ClientConfigBuilder::new(endpoint)
    }
}

/// Builder for [`ClientConfig`], separating "how it's supplied" from "what
/// it is" — the same split minus the CLI-parsing half, which is out of
/// scope.
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    endpoint: Url,
    request_timeout: Duration,
    force_debug_tracing: bool,
}

impl ClientConfigBuilder {
    fn new(endpoint: &str) -> Result<Self, RpcClientError> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            RpcClientError::invalid_argument(format!("invalid endpoint URL {endpoint:?}: {e}"))
        })?;
        Ok(Self {
            endpoint,
            request_timeout: Duration::from_secs(30),
            force_debug_tracing: false,
        })
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn force_debug_tracing(mut self, force: bool) -> Self {
        self.force_debug_tracing = force;
        self
    }

    pub fn build(self) -> ClientConfig {
        ClientConfig {
            endpoint: self.endpoint,
            request_timeout: self.request_timeout,
            force_debug_tracing: self.force_debug_tracing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_and_overrides() {
        let config = ClientConfig::builder("https://example.invalid/rpc")
            .unwrap()
            .request_timeout(Duration::from_secs(5))
            .force_debug_tracing(true)
            .build();
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert!(config.force_debug_tracing);
    }

    #[test]
    fn rejects_malformed_endpoint() {
        assert!(ClientConfig::builder("not a url").is_err());
    }
}
