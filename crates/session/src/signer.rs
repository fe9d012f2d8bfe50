// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::PermitError;
use alloy::{
    primitives::{Address, Signature},
    signers::{local::PrivateKeySigner, SignerSync},
};
use async_trait::async_trait;
use nebula_engine::Eip712Payload;

/// Signs decryption permits on behalf of one account. The seam lets a host
/// application route signing through a wallet instead of a raw key.
#[async_trait]
pub trait PermitSigner: Send + Sync {
    fn address(&self) -> Address;
    async fn sign_typed_data(&self, payload: &Eip712Payload) -> Result<Signature, PermitError>;
}

/// Signer backed by an in-process private key.
pub struct LocalPermitSigner {
    signer: PrivateKeySigner,
}

impl LocalPermitSigner {
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    pub fn random() -> Self {
        Self {
            signer: PrivateKeySigner::random(),
        }
    }
}

#[async_trait]
impl PermitSigner for LocalPermitSigner {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn sign_typed_data(&self, payload: &Eip712Payload) -> Result<Signature, PermitError> {
        self.signer
            .sign_hash_sync(&payload.signing_hash())
            .map_err(|err| PermitError::Signature(err.to_string()))
    }
}
