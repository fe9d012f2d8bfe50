// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy::providers::fillers::BlobGasFiller;
use alloy::{
    network::{Ethereum, EthereumWallet},
    primitives::{Address, Bytes, B256, U256},
    providers::fillers::{
        ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller,
    },
    providers::{Identity, Provider, ProviderBuilder, RootProvider},
    rpc::types::TransactionReceipt,
    signers::local::PrivateKeySigner,
    sol,
    sol_types::SolEvent,
};
use async_trait::async_trait;
use eyre::{eyre, Result};
use std::marker::PhantomData;
use std::sync::Arc;

sol! {
    #[derive(Debug)]
    struct CompanionView {
        uint256 companionId;
        string profileCID;
        uint8 privacyLevel;
        uint256 createdAt;
        uint256 updatedAt;
        address[] owners;
        uint256 storyCount;
        bool hasVitalAura;
    }

    #[derive(Debug)]
    struct StoryView {
        uint256 storyId;
        uint256 companionId;
        address author;
        string logCID;
        uint8 eventType;
        uint256 timestamp;
        bool verified;
        address verifier;
        string verifyCID;
        bool hasEncryptedVital;
    }

    #[derive(Debug)]
    #[sol(rpc)]
    contract NebulaCareRegistry {
        uint256 public nextCompanionId;

        event CompanionRegistered(uint256 indexed companionId, address indexed owner, string profileCID);
        event StoryCaptured(uint256 indexed companionId, uint256 indexed storyId, address indexed author);
        event StoryAttested(uint256 companionId, uint256 storyId, address verifier, string verifyCID, bool approved);

        function registerCompanion(string calldata profileCID, address[] calldata coOwners, uint8 privacyLevel) external returns (uint256 companionId);
        function recordStory(uint256 companionId, string calldata logCID, uint8 eventType) external returns (uint256 storyId);
        function recordStoryWithVital(uint256 companionId, string calldata logCID, uint8 eventType, bytes32 vitalHandle, bytes calldata inputProof) external returns (uint256 storyId);
        function getCompanion(uint256 companionId) external view returns (CompanionView memory);
        function getStories(uint256 companionId, uint256 offset, uint256 limit) external view returns (StoryView[] memory);
        function getCompanionVitalSummary(uint256 companionId) external view returns (bytes32 sumHandle, bytes32 countHandle);
        function getStoryVitalHandle(uint256 storyId) external view returns (bytes32 vitalHandle);
    }
}

/// Trait for read-only operations on the care registry
#[async_trait]
pub trait CareRegistryRead {
    /// Next unassigned companion id; registered ids are `1..next`
    async fn next_companion_id(&self) -> Result<u64>;

    /// Fetch one companion record
    async fn get_companion(&self, companion_id: u64) -> Result<CompanionView>;

    /// Fetch a page of a companion's story log
    async fn get_stories(&self, companion_id: u64, offset: u64, limit: u64)
        -> Result<Vec<StoryView>>;

    /// Encrypted (sum, count) vital aggregate handles for a companion
    async fn get_vital_summary(&self, companion_id: u64) -> Result<(B256, B256)>;

    /// Encrypted vital handle attached to one story
    async fn get_story_vital_handle(&self, story_id: u64) -> Result<B256>;
}

/// Trait for write operations on the care registry
#[async_trait]
pub trait CareRegistryWrite {
    /// Register a new companion, returning its id
    async fn register_companion(
        &self,
        profile_cid: &str,
        co_owners: Vec<Address>,
        privacy_level: u8,
    ) -> Result<(u64, TransactionReceipt)>;

    /// Record a plain story entry
    async fn record_story(
        &self,
        companion_id: u64,
        log_cid: &str,
        event_type: u8,
    ) -> Result<(u64, TransactionReceipt)>;

    /// Record a story carrying an encrypted vital handle and its input proof
    async fn record_story_with_vital(
        &self,
        companion_id: u64,
        log_cid: &str,
        event_type: u8,
        vital_handle: B256,
        input_proof: Bytes,
    ) -> Result<(u64, TransactionReceipt)>;
}

/// Generic type to represent different provider types
pub trait ProviderType: Send {
    type Provider: Provider + Send + Sync + 'static;
}

/// Marker type for read-only provider
#[derive(Clone)]
pub struct ReadOnly;
impl ProviderType for ReadOnly {
    type Provider = RegistryReadOnlyProvider;
}
/// Marker type for read-write provider
#[derive(Clone)]
pub struct ReadWrite;
impl ProviderType for ReadWrite {
    type Provider = RegistryWriteProvider;
}

/// Type alias for read-only provider
pub type RegistryReadOnlyProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider,
>;

/// Type alias for read-write provider
pub type RegistryWriteProvider = FillProvider<
    JoinFill<
        JoinFill<
            JoinFill<
                Identity,
                JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
            >,
            WalletFiller<EthereumWallet>,
        >,
        NonceFiller,
    >,
    RootProvider<Ethereum>,
    Ethereum,
>;

/// Generic care registry contract handle
#[derive(Clone)]
pub struct CareRegistryContract<T: ProviderType> {
    pub provider: Arc<T::Provider>,
    pub contract_address: Address,
    _marker: PhantomData<T>,
}

impl<T: ProviderType> CareRegistryContract<T> {
    pub fn address(&self) -> &Address {
        &self.contract_address
    }
}

/// Type aliases for the two contract variants
pub type CareRegistryReadContract = CareRegistryContract<ReadOnly>;
pub type CareRegistryWriteContract = CareRegistryContract<ReadWrite>;

// Factory for creating contract instances
pub struct CareRegistryFactory;

impl CareRegistryFactory {
    /// Create a write-capable contract
    pub async fn create_write(
        http_rpc_url: &str,
        contract_address: &str,
        private_key: &str,
    ) -> Result<CareRegistryContract<ReadWrite>> {
        let contract_address = contract_address.parse()?;

        let signer: PrivateKeySigner = private_key.parse()?;
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .with_cached_nonce_management()
            .connect(http_rpc_url)
            .await?;

        Ok(CareRegistryContract::<ReadWrite> {
            provider: Arc::new(provider),
            contract_address,
            _marker: PhantomData,
        })
    }

    /// Create a read-only contract
    pub async fn create_read(
        http_rpc_url: &str,
        contract_address: &str,
    ) -> Result<CareRegistryContract<ReadOnly>> {
        let contract_address = contract_address.parse()?;

        let provider = ProviderBuilder::new().connect(http_rpc_url).await?;

        Ok(CareRegistryContract::<ReadOnly> {
            provider: Arc::new(provider),
            contract_address,
            _marker: PhantomData,
        })
    }
}

#[async_trait]
impl<T: Send + Sync> CareRegistryRead for CareRegistryContract<T>
where
    T: ProviderType,
{
    async fn next_companion_id(&self) -> Result<u64> {
        let contract = NebulaCareRegistry::new(self.contract_address, &self.provider);
        let next = contract.nextCompanionId().call().await?;
        u64_try_from(next)
    }

    async fn get_companion(&self, companion_id: u64) -> Result<CompanionView> {
        let contract = NebulaCareRegistry::new(self.contract_address, &self.provider);
        let view = contract.getCompanion(U256::from(companion_id)).call().await?;
        Ok(view)
    }

    async fn get_stories(
        &self,
        companion_id: u64,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<StoryView>> {
        let contract = NebulaCareRegistry::new(self.contract_address, &self.provider);
        let stories = contract
            .getStories(
                U256::from(companion_id),
                U256::from(offset),
                U256::from(limit),
            )
            .call()
            .await?;
        Ok(stories)
    }

    async fn get_vital_summary(&self, companion_id: u64) -> Result<(B256, B256)> {
        let contract = NebulaCareRegistry::new(self.contract_address, &self.provider);
        let summary = contract
            .getCompanionVitalSummary(U256::from(companion_id))
            .call()
            .await?;
        Ok((summary.sumHandle, summary.countHandle))
    }

    async fn get_story_vital_handle(&self, story_id: u64) -> Result<B256> {
        let contract = NebulaCareRegistry::new(self.contract_address, &self.provider);
        let handle = contract
            .getStoryVitalHandle(U256::from(story_id))
            .call()
            .await?;
        Ok(handle)
    }
}

#[async_trait]
impl CareRegistryWrite for CareRegistryContract<ReadWrite> {
    async fn register_companion(
        &self,
        profile_cid: &str,
        co_owners: Vec<Address>,
        privacy_level: u8,
    ) -> Result<(u64, TransactionReceipt)> {
        let contract = NebulaCareRegistry::new(self.contract_address, &self.provider);
        let receipt = contract
            .registerCompanion(profile_cid.to_string(), co_owners, privacy_level)
            .send()
            .await?
            .get_receipt()
            .await?;
        let event: NebulaCareRegistry::CompanionRegistered = decode_first_event(&receipt)
            .ok_or_else(|| eyre!("No CompanionRegistered event in receipt"))?;
        Ok((u64_try_from(event.companionId)?, receipt))
    }

    async fn record_story(
        &self,
        companion_id: u64,
        log_cid: &str,
        event_type: u8,
    ) -> Result<(u64, TransactionReceipt)> {
        let contract = NebulaCareRegistry::new(self.contract_address, &self.provider);
        let receipt = contract
            .recordStory(U256::from(companion_id), log_cid.to_string(), event_type)
            .send()
            .await?
            .get_receipt()
            .await?;
        let event: NebulaCareRegistry::StoryCaptured = decode_first_event(&receipt)
            .ok_or_else(|| eyre!("No StoryCaptured event in receipt"))?;
        Ok((u64_try_from(event.storyId)?, receipt))
    }

    async fn record_story_with_vital(
        &self,
        companion_id: u64,
        log_cid: &str,
        event_type: u8,
        vital_handle: B256,
        input_proof: Bytes,
    ) -> Result<(u64, TransactionReceipt)> {
        let contract = NebulaCareRegistry::new(self.contract_address, &self.provider);
        let receipt = contract
            .recordStoryWithVital(
                U256::from(companion_id),
                log_cid.to_string(),
                event_type,
                vital_handle,
                input_proof,
            )
            .send()
            .await?
            .get_receipt()
            .await?;
        let event: NebulaCareRegistry::StoryCaptured = decode_first_event(&receipt)
            .ok_or_else(|| eyre!("No StoryCaptured event in receipt"))?;
        Ok((u64_try_from(event.storyId)?, receipt))
    }
}

fn decode_first_event<E: SolEvent>(receipt: &TransactionReceipt) -> Option<E> {
    receipt
        .inner
        .logs()
        .iter()
        .find_map(|log| log.log_decode::<E>().ok().map(|decoded| decoded.inner.data))
}

fn u64_try_from(input: U256) -> Result<u64> {
    u64::try_from(input).map_err(|_| eyre!("larger than 64-bit"))
}
