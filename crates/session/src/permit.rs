// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{PermitError, PermitSigner};
use alloy::primitives::Address;
use nebula_data::StringStorage;
use nebula_engine::{Eip712Payload, FhevmEngine};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Validity window of a freshly created permit.
pub const PERMIT_DURATION_DAYS: u64 = 365;

// Stand-in public key used while deriving address-blinded cache keys, so the
// key does not depend on the ephemeral keypair.
const PLACEHOLDER_PUBLIC_KEY: &str = "0x0000000000000000000000000000000000000000";

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn normalized_contracts(contract_addresses: &[Address]) -> Vec<Address> {
    let mut sorted = contract_addresses.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted
}

/// Deterministic storage key for a permit: the user address plus the EIP-712
/// hash of a timestamp-free payload over the sorted contract set. The hash
/// uses the supplied public key when given, or a zero-address placeholder so
/// the blinded key stays stable across permits created at different times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitCacheKey(String);

impl PermitCacheKey {
    pub fn derive(
        engine: &dyn FhevmEngine,
        contract_addresses: &[Address],
        user: Address,
        public_key: Option<&str>,
    ) -> Self {
        let contracts = normalized_contracts(contract_addresses);
        let placeholder = public_key.unwrap_or(PLACEHOLDER_PUBLIC_KEY);
        let payload = engine.create_eip712(placeholder, &contracts, 0, 0);
        Self(format!("{}:{}", user, payload.signing_hash()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PermitCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A signed decryption authorization. Immutable once created; renewal means
/// creating a new permit. The signed typed payload is persisted alongside the
/// signature so it can be reproduced without a live engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionPermit {
    user: Address,
    public_key: String,
    private_key: String,
    signature: String,
    contract_addresses: Vec<Address>,
    start_timestamp: u64,
    duration_days: u64,
    eip712: Eip712Payload,
}

impl DecryptionPermit {
    /// Generate a keypair, build the typed payload, and have the signer
    /// authorize it.
    pub async fn create(
        engine: &dyn FhevmEngine,
        signer: &dyn PermitSigner,
        contract_addresses: &[Address],
    ) -> Result<Self, PermitError> {
        let contracts = normalized_contracts(contract_addresses);
        let keypair = engine.generate_keypair();
        let start_timestamp = now();
        let payload = engine.create_eip712(
            &keypair.public_key,
            &contracts,
            start_timestamp,
            PERMIT_DURATION_DAYS,
        );
        let signature = signer.sign_typed_data(&payload).await?;
        Ok(Self {
            user: signer.address(),
            public_key: keypair.public_key,
            private_key: keypair.private_key,
            signature: format!("0x{}", hex::encode(signature.as_bytes())),
            contract_addresses: contracts,
            start_timestamp,
            duration_days: PERMIT_DURATION_DAYS,
            eip712: payload,
        })
    }

    pub fn user(&self) -> Address {
        self.user
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn private_key(&self) -> &str {
        &self.private_key
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn contract_addresses(&self) -> &[Address] {
        &self.contract_addresses
    }

    pub fn start_timestamp(&self) -> u64 {
        self.start_timestamp
    }

    pub fn duration_days(&self) -> u64 {
        self.duration_days
    }

    /// The typed payload the signature covers.
    pub fn eip712(&self) -> &Eip712Payload {
        &self.eip712
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(now())
    }

    pub fn is_valid_at(&self, timestamp: u64) -> bool {
        timestamp
            < self
                .start_timestamp
                .saturating_add(self.duration_days.saturating_mul(86_400))
    }

    /// Fetch a still-valid permit for this user and contract set. The slot
    /// consulted is the public-key-bound one when a hint is given, otherwise
    /// the address-blinded one. Any failure, a missing entry, unparseable
    /// JSON, or an expired permit, is a cache miss.
    pub async fn load(
        storage: &dyn StringStorage,
        engine: &dyn FhevmEngine,
        contract_addresses: &[Address],
        user: Address,
        public_key_hint: Option<&str>,
    ) -> Option<Self> {
        let key = PermitCacheKey::derive(engine, contract_addresses, user, public_key_hint);
        let raw = match storage.get_item(key.as_str()).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                debug!(key = %key, "Permit load failed: {err}");
                return None;
            }
        };
        let permit: Self = match serde_json::from_str(&raw) {
            Ok(permit) => permit,
            Err(err) => {
                debug!(key = %key, "Stored permit is unreadable: {err}");
                return None;
            }
        };
        permit.is_valid().then_some(permit)
    }

    /// Persist this permit under its own derived key: bound to the permit's
    /// public key when `cache_public_key` is set, address-blinded otherwise.
    /// Storage failures are logged and swallowed so a broken cache never
    /// blocks decryption.
    pub async fn save(
        &self,
        storage: &dyn StringStorage,
        engine: &dyn FhevmEngine,
        cache_public_key: bool,
    ) {
        let public_key = cache_public_key.then_some(self.public_key.as_str());
        let key =
            PermitCacheKey::derive(engine, &self.contract_addresses, self.user, public_key);
        let serialized = match serde_json::to_string(self) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!(key = %key, "Permit serialization failed: {err}");
                return;
            }
        };
        if let Err(err) = storage.set_item(key.as_str(), &serialized).await {
            warn!(key = %key, "Permit save failed: {err}");
        }
    }

    /// The usual entry point: reuse a cached permit for this user and
    /// contract set, or create, sign, and cache a fresh one in the blinded
    /// slot.
    pub async fn load_or_create(
        storage: &dyn StringStorage,
        engine: &dyn FhevmEngine,
        signer: &dyn PermitSigner,
        contract_addresses: &[Address],
    ) -> Result<Self, PermitError> {
        if let Some(permit) =
            Self::load(storage, engine, contract_addresses, signer.address(), None).await
        {
            return Ok(permit);
        }
        let permit = Self::create(engine, signer, contract_addresses).await?;
        permit.save(storage, engine, false).await;
        Ok(permit)
    }
}
