// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    CiphertextBundle, ClearValue, Eip712Payload, EncryptedInput, EngineError, FhevmEngine,
    HandleContractPair, Keypair, PermitDomain, UserDecryptRequestVerification,
};
use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use nebula_config::{PublicKeyMaterial, PublicParamsMaterial, RelayerMetadata};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Deterministic engine for local simulation chains. No relayer, no real
/// cryptography; ciphertext handles and decrypted values are derived by
/// hashing so round trips are reproducible across processes.
pub struct MockEngine {
    chain_id: u64,
    rpc_url: String,
    metadata: RelayerMetadata,
}

impl MockEngine {
    pub fn create(rpc_url: &str, chain_id: u64, metadata: RelayerMetadata) -> Arc<dyn FhevmEngine> {
        Arc::new(Self {
            chain_id,
            rpc_url: rpc_url.to_string(),
            metadata,
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    pub fn acl_address(&self) -> Address {
        self.metadata.acl_address
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn digest(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

fn decode_hex(value: &str) -> Vec<u8> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(stripped).unwrap_or_else(|_| value.as_bytes().to_vec())
}

#[async_trait]
impl FhevmEngine for MockEngine {
    fn generate_keypair(&self) -> Keypair {
        let mut private = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut private);
        let public = digest(&[b"mock-public-key", &private]);
        Keypair {
            public_key: format!("0x{}", hex::encode(public)),
            private_key: format!("0x{}", hex::encode(private)),
        }
    }

    fn create_eip712(
        &self,
        public_key: &str,
        contract_addresses: &[Address],
        start_timestamp: u64,
        duration_days: u64,
    ) -> Eip712Payload {
        Eip712Payload {
            domain: PermitDomain {
                name: "Decryption".to_string(),
                version: "1".to_string(),
                chain_id: self.chain_id,
                verifying_contract: self.metadata.kms_verifier_address,
            },
            message: UserDecryptRequestVerification {
                public_key: Bytes::from(decode_hex(public_key)),
                contract_addresses: contract_addresses.to_vec(),
                start_timestamp,
                duration_days,
            },
        }
    }

    fn create_encrypted_input(
        &self,
        contract_address: Address,
        user_address: Address,
    ) -> Box<dyn EncryptedInput> {
        Box::new(MockEncryptedInput {
            contract_address,
            user_address,
            values: Vec::new(),
        })
    }

    async fn user_decrypt(
        &self,
        handles: &[HandleContractPair],
        _private_key: &str,
        _public_key: &str,
        signature: &str,
        contract_addresses: &[Address],
        _user_address: Address,
        start_timestamp: u64,
        duration_days: u64,
    ) -> Result<HashMap<B256, ClearValue>, EngineError> {
        if now() >= start_timestamp.saturating_add(duration_days.saturating_mul(86_400)) {
            return Err(EngineError::PermitExpired);
        }
        if decode_hex(signature).len() != 65 {
            return Err(EngineError::Signature(
                "expected a 65-byte signature".to_string(),
            ));
        }
        let mut cleared = HashMap::with_capacity(handles.len());
        for pair in handles {
            if !contract_addresses.contains(&pair.contract_address) {
                return Err(EngineError::Signature(format!(
                    "contract {} is not covered by the permit",
                    pair.contract_address
                )));
            }
            let tail: [u8; 8] = pair.handle.as_slice()[24..].try_into().unwrap();
            cleared.insert(
                pair.handle,
                ClearValue::Uint(alloy_primitives::U256::from(u64::from_be_bytes(tail))),
            );
        }
        Ok(cleared)
    }

    fn public_key(&self) -> Option<PublicKeyMaterial> {
        let data = digest(&[b"mock-fhe-public-key", &self.chain_id.to_be_bytes()]);
        Some(PublicKeyMaterial {
            id: hex::encode(&data[..8]),
            data: data.to_vec(),
        })
    }

    fn public_params(&self, bits: u32) -> Option<PublicParamsMaterial> {
        let data = digest(&[
            b"mock-fhe-public-params",
            &self.chain_id.to_be_bytes(),
            &bits.to_be_bytes(),
        ]);
        Some(PublicParamsMaterial {
            bits,
            data: data.to_vec(),
        })
    }
}

/// Input batch for [`MockEngine`]. Handles are hashes of the batch identity
/// and the value's position, so re-encrypting the same batch yields the same
/// handles.
pub struct MockEncryptedInput {
    contract_address: Address,
    user_address: Address,
    values: Vec<u64>,
}

#[async_trait]
impl EncryptedInput for MockEncryptedInput {
    fn add64(&mut self, value: u64) {
        self.values.push(value);
    }

    async fn encrypt(&self) -> Result<CiphertextBundle, EngineError> {
        let mut handles = Vec::with_capacity(self.values.len());
        for (index, value) in self.values.iter().enumerate() {
            let hash = digest(&[
                b"mock-handle",
                self.contract_address.as_slice(),
                self.user_address.as_slice(),
                &(index as u64).to_be_bytes(),
                &value.to_be_bytes(),
            ]);
            handles.push(B256::from(hash));
        }
        let mut proof_parts: Vec<u8> = Vec::with_capacity(32 * handles.len());
        for handle in &handles {
            proof_parts.extend_from_slice(handle.as_slice());
        }
        let proof = digest(&[b"mock-input-proof", &proof_parts]);
        Ok(CiphertextBundle {
            handles,
            input_proof: Bytes::from(proof.to_vec()),
        })
    }
}
