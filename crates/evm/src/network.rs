// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{NetworkTarget, NodeProbe};
use eyre::Result;
use nebula_config::MockChains;

/// What kind of network a target resolved to. Immutable once resolved;
/// recomputed whenever the provider or chain changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkProfile {
    pub is_mock: bool,
    pub chain_id: u64,
    pub rpc_url: Option<String>,
}

/// Classifies the target network by chain id.
///
/// A chain id present in `mock_chains` marks the profile as a simulation
/// candidate carrying that chain's RPC URL. Anything else is production; the
/// RPC URL is kept only when the target was a bare URL, since an injected
/// provider does not expose its endpoint.
pub async fn resolve(
    probe: &dyn NodeProbe,
    target: &NetworkTarget,
    mock_chains: &MockChains,
) -> Result<NetworkProfile> {
    let chain_id = probe.chain_id(target).await?;

    if mock_chains.contains(chain_id) {
        let rpc_url = mock_chains
            .rpc_url(chain_id)
            .map(str::to_string)
            .or_else(|| target.rpc_url().map(str::to_string))
            .unwrap_or_default();
        return Ok(NetworkProfile {
            is_mock: true,
            chain_id,
            rpc_url: Some(rpc_url),
        });
    }

    Ok(NetworkProfile {
        is_mock: false,
        chain_id,
        rpc_url: target.rpc_url().map(str::to_string),
    })
}
