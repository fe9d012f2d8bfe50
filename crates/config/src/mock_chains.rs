// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Conventional chain id of the local simulation network.
pub const LOCAL_CHAIN_ID: u64 = 31337;

/// Default RPC endpoint of the local simulation network.
pub const LOCAL_RPC_URL: &str = "http://localhost:8545";

/// Mapping of chain id to local RPC URL for networks that should be treated
/// as simulation candidates. Always contains the conventional
/// [`LOCAL_CHAIN_ID`] entry; user-supplied entries may override it.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct MockChains(HashMap<u64, String>);

impl Default for MockChains {
    fn default() -> Self {
        let mut chains = HashMap::new();
        chains.insert(LOCAL_CHAIN_ID, LOCAL_RPC_URL.to_string());
        Self(chains)
    }
}

impl MockChains {
    /// Builds the mapping from the defaults plus caller overrides.
    pub fn with_overrides(overrides: impl IntoIterator<Item = (u64, String)>) -> Self {
        let mut chains = Self::default();
        chains.0.extend(overrides);
        chains
    }

    pub fn contains(&self, chain_id: u64) -> bool {
        self.0.contains_key(&chain_id)
    }

    pub fn rpc_url(&self, chain_id: u64) -> Option<&str> {
        self.0.get(&chain_id).map(String::as_str)
    }
}
