// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{DecryptionPermit, PermitSigner};
use alloy::primitives::{B256, U256};
use eyre::{eyre, Result};
use nebula_data::StringStorage;
use nebula_engine::{ClearValue, FhevmEngine, HandleContractPair};
use nebula_evm::{
    CareRegistryContract, CareRegistryRead, CareRegistryWrite, ProviderType, ReadWrite,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Decrypted vital aggregate for one companion. `sum` is in grams across
/// `count` recorded measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VitalSummary {
    pub sum: U256,
    pub count: U256,
}

impl VitalSummary {
    pub fn average_kg(&self) -> Option<f64> {
        if self.count.is_zero() {
            return None;
        }
        let sum = u128::try_from(self.sum).ok()? as f64;
        let count = u128::try_from(self.count).ok()? as f64;
        Some(sum / count / 1000.0)
    }
}

/// Binds a care registry, an engine, and a permit cache into one decrypting
/// client. Write operations are only available on a `ReadWrite` registry.
pub struct SanctuarySession<T: ProviderType> {
    registry: CareRegistryContract<T>,
    engine: Arc<dyn FhevmEngine>,
    storage: Arc<dyn StringStorage>,
    signer: Arc<dyn PermitSigner>,
}

impl<T: ProviderType + Send + Sync> SanctuarySession<T> {
    pub fn new(
        registry: CareRegistryContract<T>,
        engine: Arc<dyn FhevmEngine>,
        storage: Arc<dyn StringStorage>,
        signer: Arc<dyn PermitSigner>,
    ) -> Self {
        Self {
            registry,
            engine,
            storage,
            signer,
        }
    }

    pub fn registry(&self) -> &CareRegistryContract<T> {
        &self.registry
    }

    pub fn engine(&self) -> &Arc<dyn FhevmEngine> {
        &self.engine
    }

    async fn decrypt_handles(&self, handles: &[B256]) -> Result<HashMap<B256, ClearValue>> {
        let contract = *self.registry.address();
        let permit = DecryptionPermit::load_or_create(
            self.storage.as_ref(),
            self.engine.as_ref(),
            self.signer.as_ref(),
            &[contract],
        )
        .await?;
        let pairs: Vec<HandleContractPair> = handles
            .iter()
            .map(|handle| HandleContractPair {
                handle: *handle,
                contract_address: contract,
            })
            .collect();
        let cleared = self
            .engine
            .user_decrypt(
                &pairs,
                permit.private_key(),
                permit.public_key(),
                permit.signature(),
                permit.contract_addresses(),
                permit.user(),
                permit.start_timestamp(),
                permit.duration_days(),
            )
            .await?;
        Ok(cleared)
    }

    /// Fetch and decrypt the companion's encrypted vital aggregate.
    pub async fn decrypt_vital_summary(&self, companion_id: u64) -> Result<VitalSummary> {
        let (sum_handle, count_handle) = self.registry.get_vital_summary(companion_id).await?;
        let cleared = self.decrypt_handles(&[sum_handle, count_handle]).await?;
        Ok(VitalSummary {
            sum: uint_of(&cleared, &sum_handle)?,
            count: uint_of(&cleared, &count_handle)?,
        })
    }

    /// Fetch and decrypt the vital measurement attached to one story.
    pub async fn decrypt_story_vital(&self, story_id: u64) -> Result<u64> {
        let handle = self.registry.get_story_vital_handle(story_id).await?;
        if handle == B256::ZERO {
            return Err(eyre!("story {story_id} carries no encrypted vital"));
        }
        let cleared = self.decrypt_handles(&[handle]).await?;
        let value = uint_of(&cleared, &handle)?;
        u64::try_from(value).map_err(|_| eyre!("decrypted vital exceeds 64 bits"))
    }
}

impl SanctuarySession<ReadWrite> {
    /// Register a new companion profile.
    pub async fn register_companion(
        &self,
        profile_cid: &str,
        co_owners: Vec<alloy::primitives::Address>,
        privacy_level: u8,
    ) -> Result<u64> {
        let (companion_id, _receipt) = self
            .registry
            .register_companion(profile_cid, co_owners, privacy_level)
            .await?;
        Ok(companion_id)
    }

    /// Record a plain story entry.
    pub async fn record_story(
        &self,
        companion_id: u64,
        log_cid: &str,
        event_type: u8,
    ) -> Result<u64> {
        let (story_id, _receipt) = self
            .registry
            .record_story(companion_id, log_cid, event_type)
            .await?;
        Ok(story_id)
    }

    /// Encrypt a vital measurement (in grams) and record it with the story.
    pub async fn record_story_with_vital(
        &self,
        companion_id: u64,
        log_cid: &str,
        event_type: u8,
        vital_grams: u64,
    ) -> Result<u64> {
        let mut input = self
            .engine
            .create_encrypted_input(*self.registry.address(), self.signer.address());
        input.add64(vital_grams);
        let bundle = input.encrypt().await?;
        let handle = *bundle
            .handles
            .first()
            .ok_or_else(|| eyre!("encryption yielded no handle"))?;
        let (story_id, _receipt) = self
            .registry
            .record_story_with_vital(
                companion_id,
                log_cid,
                event_type,
                handle,
                bundle.input_proof.clone(),
            )
            .await?;
        Ok(story_id)
    }
}

fn uint_of(cleared: &HashMap<B256, ClearValue>, handle: &B256) -> Result<U256> {
    match cleared.get(handle) {
        Some(ClearValue::Uint(value)) => Ok(*value),
        Some(ClearValue::Bool(value)) => Ok(U256::from(*value as u8)),
        Some(ClearValue::Text(_)) => Err(eyre!("expected a numeric plaintext")),
        None => Err(eyre!("decryption result is missing handle {handle}")),
    }
}
