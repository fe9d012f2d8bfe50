// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hex-encoded keypair produced by an engine. Never persisted unless the
/// caller opts into caching the public half alongside a permit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keypair {
    pub public_key: String,
    pub private_key: String,
}

/// A ciphertext handle together with the contract that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleContractPair {
    pub handle: B256,
    pub contract_address: Address,
}

/// A decrypted plaintext value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClearValue {
    Bool(bool),
    Uint(U256),
    Text(String),
}

impl ClearValue {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Uint(value) => u64::try_from(*value).ok(),
            _ => None,
        }
    }
}

/// Output of encrypting an input batch: one handle per added value plus the
/// zero-knowledge proof binding them to the target contract and user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiphertextBundle {
    pub handles: Vec<B256>,
    pub input_proof: Bytes,
}

/// EIP-712 domain for a decryption permit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

/// The `UserDecryptRequestVerification` message a user signs to authorize
/// decryption of handles owned by `contract_addresses`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDecryptRequestVerification {
    pub public_key: Bytes,
    pub contract_addresses: Vec<Address>,
    pub start_timestamp: u64,
    pub duration_days: u64,
}

/// A complete typed-data payload ready for signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eip712Payload {
    pub domain: PermitDomain,
    pub message: UserDecryptRequestVerification,
}

const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
const MESSAGE_TYPE: &str = "UserDecryptRequestVerification(bytes publicKey,address[] contractAddresses,uint256 startTimestamp,uint256 durationDays)";

impl Eip712Payload {
    /// The EIP-712 digest of this payload, `keccak256(0x1901 || domainSeparator || structHash)`.
    pub fn signing_hash(&self) -> B256 {
        let mut buf = Vec::with_capacity(66);
        buf.extend_from_slice(&[0x19, 0x01]);
        buf.extend_from_slice(self.domain_separator().as_slice());
        buf.extend_from_slice(self.struct_hash().as_slice());
        keccak256(&buf)
    }

    fn domain_separator(&self) -> B256 {
        let mut buf = Vec::with_capacity(32 * 5);
        buf.extend_from_slice(keccak256(DOMAIN_TYPE.as_bytes()).as_slice());
        buf.extend_from_slice(keccak256(self.domain.name.as_bytes()).as_slice());
        buf.extend_from_slice(keccak256(self.domain.version.as_bytes()).as_slice());
        buf.extend_from_slice(&U256::from(self.domain.chain_id).to_be_bytes::<32>());
        buf.extend_from_slice(&address_word(&self.domain.verifying_contract));
        keccak256(&buf)
    }

    fn struct_hash(&self) -> B256 {
        let mut addresses = Vec::with_capacity(32 * self.message.contract_addresses.len());
        for address in &self.message.contract_addresses {
            addresses.extend_from_slice(&address_word(address));
        }

        let mut buf = Vec::with_capacity(32 * 5);
        buf.extend_from_slice(keccak256(MESSAGE_TYPE.as_bytes()).as_slice());
        buf.extend_from_slice(keccak256(&self.message.public_key).as_slice());
        buf.extend_from_slice(keccak256(&addresses).as_slice());
        buf.extend_from_slice(&U256::from(self.message.start_timestamp).to_be_bytes::<32>());
        buf.extend_from_slice(&U256::from(self.message.duration_days).to_be_bytes::<32>());
        keccak256(&buf)
    }
}

fn address_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_slice());
    word
}

/// Errors surfaced by a live engine instance.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("decryption permit expired")]
    PermitExpired,
    #[error("signature rejected: {0}")]
    Signature(String),
    #[error("relayer request failed: {0}")]
    Relayer(String),
    #[error("{0}")]
    Internal(String),
}
