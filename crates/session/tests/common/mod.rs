// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

#![allow(dead_code)]

use alloy::primitives::Address;
use async_trait::async_trait;
use eyre::{eyre, Result};
use nebula_config::{ConfigVersion, InstanceConfig, RelayerMetadata};
use nebula_data::PublicParamsStore;
use nebula_engine::{
    EngineError, EngineFactory, FhevmEngine, InstanceParams, LoadError, LocalSdkSource,
    MockEngine, SdkArtifact, SdkBackend, SdkLoader, SdkRuntime,
};
use nebula_evm::{NetworkTarget, NodeProbe};
use nebula_session::{EngineStack, LocalPermitSigner, PermitError, PermitSigner};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

pub fn metadata() -> RelayerMetadata {
    serde_json::from_value(serde_json::json!({
        "ACLAddress": "0x50157CFfD6bBFA2DECe204a89ec419c23ef5755D",
        "InputVerifierAddress": "0x901F8942346f7AB3a01F6D7613119Bca447Bb030",
        "KMSVerifierAddress": "0x1364cBBf2cDF5032C47d8226a6f6FBD2AFCDacAC",
    }))
    .unwrap()
}

pub fn mock_engine() -> Arc<dyn FhevmEngine> {
    MockEngine::create("http://localhost:8545", 31337, metadata())
}

/// Probe with scripted answers, plus an optional token it cancels while
/// answering the chain id query.
pub struct ScriptedProbe {
    pub chain_id: u64,
    pub version: Option<String>,
    pub metadata: Option<RelayerMetadata>,
    pub cancel_on_chain_id: Option<CancellationToken>,
}

impl ScriptedProbe {
    pub fn local_node() -> Self {
        Self {
            chain_id: 31337,
            version: Some("HardhatNetwork/2.22.0/@fhevm/hardhat-plugin".to_string()),
            metadata: Some(metadata()),
            cancel_on_chain_id: None,
        }
    }

    pub fn production() -> Self {
        Self {
            chain_id: SEPOLIA_CHAIN_ID,
            version: Some("Geth/v1.14.0-stable".to_string()),
            metadata: None,
            cancel_on_chain_id: None,
        }
    }
}

#[async_trait]
impl NodeProbe for ScriptedProbe {
    async fn chain_id(&self, _target: &NetworkTarget) -> Result<u64> {
        if let Some(token) = &self.cancel_on_chain_id {
            token.cancel();
        }
        Ok(self.chain_id)
    }

    async fn client_version(&self, _rpc_url: &str) -> Result<String> {
        self.version
            .clone()
            .ok_or_else(|| eyre!("client version unavailable"))
    }

    async fn relayer_metadata(&self, _rpc_url: &str) -> Result<RelayerMetadata> {
        self.metadata
            .clone()
            .ok_or_else(|| eyre!("relayer metadata unavailable"))
    }
}

/// Factory with a scripted base-config table and call counters.
pub struct TestFactory {
    pub configs: HashMap<ConfigVersion, InstanceConfig>,
    pub inits: AtomicUsize,
    pub creates: AtomicUsize,
}

impl TestFactory {
    pub fn with_configs(configs: HashMap<ConfigVersion, InstanceConfig>) -> Arc<Self> {
        Arc::new(Self {
            configs,
            inits: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl EngineFactory for TestFactory {
    fn base_config(&self, version: ConfigVersion) -> Option<InstanceConfig> {
        self.configs.get(&version).cloned()
    }

    async fn init(&self) -> Result<(), EngineError> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create_instance(
        &self,
        _params: InstanceParams,
    ) -> Result<Arc<dyn FhevmEngine>, EngineError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(MockEngine::create(
            "http://relayer.invalid",
            SEPOLIA_CHAIN_ID,
            metadata(),
        ))
    }
}

pub struct TestBackend {
    pub factory: Arc<TestFactory>,
    pub instantiations: AtomicUsize,
}

impl SdkBackend for TestBackend {
    fn instantiate(&self, _artifact: &SdkArtifact) -> Result<Arc<dyn EngineFactory>, LoadError> {
        self.instantiations.fetch_add(1, Ordering::SeqCst);
        Ok(self.factory.clone())
    }
}

/// A config carrying every field, with a parseable access-control address.
pub fn full_config() -> InstanceConfig {
    InstanceConfig {
        acl_contract_address: Some("0x50157CFfD6bBFA2DECe204a89ec419c23ef5755D".to_string()),
        kms_contract_address: Some("0x1364cBBf2cDF5032C47d8226a6f6FBD2AFCDacAC".to_string()),
        input_verifier_contract_address: Some(
            "0x901F8942346f7AB3a01F6D7613119Bca447Bb030".to_string(),
        ),
        verifying_contract_address: Some("0x1364cBBf2cDF5032C47d8226a6f6FBD2AFCDacAC".to_string()),
        gateway_chain_id: Some(55_815),
        relayer_url: Some("https://relayer.testnet.zama.cloud".to_string()),
    }
}

pub struct TestStack {
    pub stack: EngineStack,
    pub factory: Arc<TestFactory>,
    // Keeps the bundle file alive for the loader.
    pub _bundle_dir: tempfile::TempDir,
}

/// An engine stack wired entirely from test doubles: a scripted probe, a
/// one-file loader, and an in-memory parameter store.
pub fn test_stack(probe: ScriptedProbe, configs: HashMap<ConfigVersion, InstanceConfig>) -> TestStack {
    let bundle_dir = tempfile::tempdir().unwrap();
    let bundle = bundle_dir.path().join("bundle.cjs");
    std::fs::write(&bundle, b"module.exports = {}").unwrap();

    let factory = TestFactory::with_configs(configs);
    let backend = Arc::new(TestBackend {
        factory: factory.clone(),
        instantiations: AtomicUsize::new(0),
    });
    let stack = EngineStack {
        runtime: Arc::new(SdkRuntime::new(backend)),
        loader: Arc::new(SdkLoader::with_sources(vec![Box::new(
            LocalSdkSource::new(bundle),
        )])),
        probe: Arc::new(probe),
        params_store: Arc::new(PublicParamsStore::in_memory()),
    };
    TestStack {
        stack,
        factory,
        _bundle_dir: bundle_dir,
    }
}

/// Signer that counts how often it is asked to sign.
pub struct CountingSigner {
    inner: LocalPermitSigner,
    pub signs: AtomicUsize,
}

impl CountingSigner {
    pub fn random() -> Self {
        Self {
            inner: LocalPermitSigner::random(),
            signs: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PermitSigner for CountingSigner {
    fn address(&self) -> Address {
        self.inner.address()
    }

    async fn sign_typed_data(
        &self,
        payload: &nebula_engine::Eip712Payload,
    ) -> Result<alloy::primitives::Signature, PermitError> {
        self.signs.fetch_add(1, Ordering::SeqCst);
        self.inner.sign_typed_data(payload).await
    }
}
