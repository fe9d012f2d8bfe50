// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::NetworkTarget;
use alloy::providers::{Provider, ProviderBuilder};
use async_trait::async_trait;
use eyre::{Result, WrapErr};
use nebula_config::RelayerMetadata;
use tracing::debug;

/// Substring a local simulation node must report in its client version.
pub const LOCAL_NODE_MARKER: &str = "hardhat";

/// Node metadata queries used while classifying a network.
///
/// A trait seam so the session builder can be exercised without a live node.
#[async_trait]
pub trait NodeProbe: Send + Sync {
    async fn chain_id(&self, target: &NetworkTarget) -> Result<u64>;
    async fn client_version(&self, rpc_url: &str) -> Result<String>;
    async fn relayer_metadata(&self, rpc_url: &str) -> Result<RelayerMetadata>;
}

/// Probe that issues real JSON-RPC calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct RpcProbe;

#[async_trait]
impl NodeProbe for RpcProbe {
    async fn chain_id(&self, target: &NetworkTarget) -> Result<u64> {
        let provider = target.connect().await?;
        provider.get_chain_id().await.wrap_err("Chain id query failed")
    }

    async fn client_version(&self, rpc_url: &str) -> Result<String> {
        let provider = ProviderBuilder::new().connect(rpc_url).await?;
        let version: String = provider
            .client()
            .request_noparams("web3_clientVersion")
            .await
            .wrap_err("web3_clientVersion query failed")?;
        Ok(version)
    }

    async fn relayer_metadata(&self, rpc_url: &str) -> Result<RelayerMetadata> {
        let provider = ProviderBuilder::new().connect(rpc_url).await?;
        // Deserializing straight into RelayerMetadata validates the shape:
        // a missing field or malformed address surfaces as an error here.
        let metadata: RelayerMetadata = provider
            .client()
            .request_noparams("fhevm_relayer_metadata")
            .await
            .wrap_err_with(|| format!("Unable to fetch FHEVM relayer metadata from {rpc_url}"))?;
        Ok(metadata)
    }
}

/// Confirms that `rpc_url` points at a genuine local simulation node.
///
/// Returns the node's relayer metadata only when the client version contains
/// [`LOCAL_NODE_MARKER`] and the metadata call yields all three contract
/// addresses. Every failure (RPC error, foreign client version, bad shape)
/// resolves to `None`; this probe never propagates an error, so a flaky
/// local node degrades to production handling instead of failing the build.
pub async fn try_resolve_mock_metadata(
    probe: &dyn NodeProbe,
    rpc_url: &str,
) -> Option<RelayerMetadata> {
    let version = match probe.client_version(rpc_url).await {
        Ok(version) => version,
        Err(err) => {
            debug!(rpc_url, "Client version probe failed: {err}");
            return None;
        }
    };
    if !version.to_lowercase().contains(LOCAL_NODE_MARKER) {
        return None;
    }
    match probe.relayer_metadata(rpc_url).await {
        Ok(metadata) => Some(metadata),
        Err(err) => {
            debug!(rpc_url, "Relayer metadata probe failed: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::eyre;

    struct FakeProbe {
        version: Result<String, String>,
        metadata: Result<RelayerMetadata, String>,
    }

    fn metadata() -> RelayerMetadata {
        serde_json::from_value(serde_json::json!({
            "ACLAddress": "0x50157CFfD6bBFA2DECe204a89ec419c23ef5755D",
            "InputVerifierAddress": "0x901F8942346f7AB3a01F6D7613119Bca447Bb030",
            "KMSVerifierAddress": "0x1364cBBf2cDF5032C47d8226a6f6FBD2AFCDacAC",
        }))
        .unwrap()
    }

    #[async_trait]
    impl NodeProbe for FakeProbe {
        async fn chain_id(&self, _target: &NetworkTarget) -> Result<u64> {
            Ok(31337)
        }

        async fn client_version(&self, _rpc_url: &str) -> Result<String> {
            self.version.clone().map_err(|e| eyre!(e))
        }

        async fn relayer_metadata(&self, _rpc_url: &str) -> Result<RelayerMetadata> {
            self.metadata.clone().map_err(|e| eyre!(e))
        }
    }

    #[tokio::test]
    async fn confirms_a_hardhat_node_with_metadata() {
        let probe = FakeProbe {
            version: Ok("HardhatNetwork/2.22.0/@fhevm/hardhat-plugin".to_string()),
            metadata: Ok(metadata()),
        };
        let resolved = try_resolve_mock_metadata(&probe, "http://localhost:8545").await;
        assert_eq!(resolved, Some(metadata()));
    }

    #[tokio::test]
    async fn rejects_a_foreign_client_version() {
        let probe = FakeProbe {
            version: Ok("Geth/v1.14.0-stable".to_string()),
            metadata: Ok(metadata()),
        };
        assert!(try_resolve_mock_metadata(&probe, "http://localhost:8545")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn swallows_version_probe_failures() {
        let probe = FakeProbe {
            version: Err("connection refused".to_string()),
            metadata: Ok(metadata()),
        };
        assert!(try_resolve_mock_metadata(&probe, "http://localhost:8545")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn swallows_metadata_probe_failures() {
        let probe = FakeProbe {
            version: Ok("hardhat/2.22.0".to_string()),
            metadata: Err("missing field `KMSVerifierAddress`".to_string()),
        };
        assert!(try_resolve_mock_metadata(&probe, "http://localhost:8545")
            .await
            .is_none());
    }
}
