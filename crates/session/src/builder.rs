// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{BuildError, BuildStatus};
use alloy::primitives::Address;
use nebula_config::{InstanceConfig, MockChains, CONFIG_VERSION_FALLBACK, DEFAULT_PARAMS_BITS};
use nebula_data::PublicParamsStore;
use nebula_engine::{
    EngineFactory, FhevmEngine, InitError, InstanceParams, MockEngine, SdkLoader, SdkRuntime,
};
use nebula_evm::{resolve, try_resolve_mock_metadata, NetworkTarget, NodeProbe};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// The long-lived dependencies an engine build draws on. One stack is shared
/// across every session a host application opens.
#[derive(Clone)]
pub struct EngineStack {
    pub runtime: Arc<SdkRuntime>,
    pub loader: Arc<SdkLoader>,
    pub probe: Arc<dyn NodeProbe>,
    pub params_store: Arc<PublicParamsStore>,
}

/// One engine build: the target network plus the caller's cancellation token
/// and optional progress listener.
pub struct BuildRequest {
    pub network: NetworkTarget,
    pub mock_chains: MockChains,
    pub cancel: CancellationToken,
    pub status: Option<mpsc::UnboundedSender<BuildStatus>>,
}

impl BuildRequest {
    pub fn new(network: NetworkTarget) -> Self {
        Self {
            network,
            mock_chains: MockChains::default(),
            cancel: CancellationToken::new(),
            status: None,
        }
    }

    fn notify(&self, status: BuildStatus) {
        if let Some(sender) = &self.status {
            let _ = sender.send(status);
        }
    }

    fn checkpoint(&self) -> Result<(), BuildError> {
        if self.cancel.is_cancelled() {
            return Err(BuildError::Cancelled);
        }
        Ok(())
    }
}

/// Builds an engine for the requested network.
///
/// Simulation chains that answer the local-node probe get a deterministic
/// in-process engine without touching the SDK. Everything else goes through
/// load, init, base-config resolution, and instance creation, with a
/// cancellation checkpoint after every await.
pub async fn create_engine(
    stack: &EngineStack,
    request: &BuildRequest,
) -> Result<Arc<dyn FhevmEngine>, BuildError> {
    let profile = resolve(stack.probe.as_ref(), &request.network, &request.mock_chains).await?;
    request.checkpoint()?;
    debug!(chain_id = profile.chain_id, is_mock = profile.is_mock, "Network resolved");

    if profile.is_mock {
        if let Some(rpc_url) = &profile.rpc_url {
            if let Some(metadata) =
                try_resolve_mock_metadata(stack.probe.as_ref(), rpc_url).await
            {
                request.checkpoint()?;
                request.notify(BuildStatus::Creating);
                info!(chain_id = profile.chain_id, "Using simulation engine");
                return Ok(MockEngine::create(rpc_url, profile.chain_id, metadata));
            }
            request.checkpoint()?;
        }
    }

    if !stack.runtime.is_loaded().await {
        request.checkpoint()?;
        request.notify(BuildStatus::SdkLoading);
        stack.runtime.ensure_loaded(&stack.loader).await?;
        request.checkpoint()?;
        request.notify(BuildStatus::SdkLoaded);
    }
    if !stack.runtime.is_initialized().await {
        request.checkpoint()?;
        request.notify(BuildStatus::SdkInitializing);
        stack.runtime.ensure_initialized().await?;
        request.checkpoint()?;
        request.notify(BuildStatus::SdkInitialized);
    }

    let factory = stack
        .runtime
        .factory()
        .await
        .ok_or(BuildError::Init(InitError::NotLoaded))?;
    request.checkpoint()?;

    let config = resolve_base_config(factory.as_ref())?;
    let acl_address = parse_acl_address(&config)?;

    let cached = stack.params_store.get(acl_address).await;
    request.checkpoint()?;

    let params = InstanceParams {
        config,
        network: request.network.clone(),
        public_key: cached.public_key,
        public_params: cached.public_params,
    };

    request.notify(BuildStatus::Creating);
    let engine = factory
        .create_instance(params)
        .await
        .map_err(BuildError::Create)?;
    request.checkpoint()?;

    let public_key = engine.public_key();
    let public_params = engine.public_params(DEFAULT_PARAMS_BITS);
    stack
        .params_store
        .set(acl_address, public_key.as_ref(), public_params.as_ref())
        .await;
    request.checkpoint()?;

    Ok(engine)
}

/// First config version the factory actually carries wins; later versions in
/// the fallback order are only consulted when the earlier entry is absent
/// entirely.
fn resolve_base_config(factory: &dyn EngineFactory) -> Result<InstanceConfig, BuildError> {
    CONFIG_VERSION_FALLBACK
        .iter()
        .find_map(|version| factory.base_config(*version))
        .ok_or(BuildError::ConfigNotFound)
}

fn parse_acl_address(config: &InstanceConfig) -> Result<Address, BuildError> {
    let raw = config
        .acl_contract_address
        .as_deref()
        .ok_or(BuildError::ConfigNotFound)?;
    raw.parse()
        .map_err(|_| BuildError::InvalidAddress(raw.to_string()))
}
