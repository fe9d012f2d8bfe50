// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    CiphertextBundle, ClearValue, Eip712Payload, EngineError, Keypair, LoadError, SdkArtifact,
};
use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use nebula_config::{ConfigVersion, InstanceConfig, PublicKeyMaterial, PublicParamsMaterial};
use nebula_evm::NetworkTarget;
use std::collections::HashMap;
use std::sync::Arc;

/// A live FHEVM engine bound to one network.
///
/// Synchronous operations are local cryptography; only `user_decrypt` talks
/// to the relayer (or simulates it).
#[async_trait]
pub trait FhevmEngine: Send + Sync {
    /// Generate an ephemeral keypair for user decryption.
    fn generate_keypair(&self) -> Keypair;

    /// Build the typed-data payload a user signs to authorize decryption.
    fn create_eip712(
        &self,
        public_key: &str,
        contract_addresses: &[Address],
        start_timestamp: u64,
        duration_days: u64,
    ) -> Eip712Payload;

    /// Start an encrypted input batch targeting one contract and user.
    fn create_encrypted_input(
        &self,
        contract_address: Address,
        user_address: Address,
    ) -> Box<dyn EncryptedInput>;

    /// Decrypt ciphertext handles under a signed permit.
    #[allow(clippy::too_many_arguments)]
    async fn user_decrypt(
        &self,
        handles: &[crate::HandleContractPair],
        private_key: &str,
        public_key: &str,
        signature: &str,
        contract_addresses: &[Address],
        user_address: Address,
        start_timestamp: u64,
        duration_days: u64,
    ) -> Result<HashMap<B256, ClearValue>, EngineError>;

    /// The engine's FHE public key, when it exposes one.
    fn public_key(&self) -> Option<PublicKeyMaterial>;

    /// The engine's public parameters for the given bit size.
    fn public_params(&self, bits: u32) -> Option<PublicParamsMaterial>;
}

/// An in-progress encrypted input batch.
#[async_trait]
pub trait EncryptedInput: Send {
    /// Append a 64-bit unsigned value.
    fn add64(&mut self, value: u64);

    /// Encrypt the batch, yielding one handle per value plus the input proof.
    async fn encrypt(&self) -> Result<CiphertextBundle, EngineError>;
}

/// Everything an engine instance needs at construction time.
#[derive(Debug, Clone)]
pub struct InstanceParams {
    pub config: InstanceConfig,
    pub network: NetworkTarget,
    pub public_key: Option<PublicKeyMaterial>,
    pub public_params: Option<PublicParamsMaterial>,
}

/// A loaded engine factory. One per loaded SDK artifact; must be initialized
/// once before instances can be created.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    /// The factory's built-in base configuration for a known network, if any.
    fn base_config(&self, version: ConfigVersion) -> Option<InstanceConfig>;

    /// One-time global initialization.
    async fn init(&self) -> Result<(), EngineError>;

    /// Create an engine instance for the given parameters.
    async fn create_instance(
        &self,
        params: InstanceParams,
    ) -> Result<Arc<dyn FhevmEngine>, EngineError>;
}

/// Turns a fetched SDK artifact into a usable factory.
pub trait SdkBackend: Send + Sync {
    fn instantiate(&self, artifact: &SdkArtifact) -> Result<Arc<dyn EngineFactory>, LoadError>;
}
