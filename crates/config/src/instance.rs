// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Known shapes of the relayer base configuration, newest first.
///
/// The relayer SDK has shipped two configuration layouts so far. Rather than
/// probing an opaque object for whichever fields happen to exist, the
/// supported versions are modelled as data and resolved through
/// [`CONFIG_VERSION_FALLBACK`].
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum ConfigVersion {
    /// The v0.9 "ZamaEthereum" configuration.
    EthereumV09,
    /// The older v0.8 "Sepolia" configuration.
    SepoliaV08,
}

/// Resolution order for base configurations: prefer the newest shape.
pub const CONFIG_VERSION_FALLBACK: [ConfigVersion; 2] =
    [ConfigVersion::EthereumV09, ConfigVersion::SepoliaV08];

/// A relayer network configuration as published by the engine SDK.
///
/// The access-control (ACL) address is optional because a published
/// configuration may predate the field; the builder treats its absence the
/// same as a missing configuration.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct InstanceConfig {
    pub acl_contract_address: Option<String>,
    pub kms_contract_address: Option<String>,
    pub input_verifier_contract_address: Option<String>,
    pub verifying_contract_address: Option<String>,
    pub gateway_chain_id: Option<u64>,
    pub relayer_url: Option<String>,
}

impl InstanceConfig {
    /// Validates that the relayer URL, when present, is well formed.
    pub fn validated_relayer_url(&self) -> Result<Option<Url>> {
        self.relayer_url
            .as_deref()
            .map(|raw| Url::parse(raw).context("Invalid relayer URL"))
            .transpose()
    }
}
