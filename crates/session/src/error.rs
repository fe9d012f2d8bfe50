// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use nebula_engine::{EngineError, InitError, LoadError};
use thiserror::Error;

/// Why an engine build stopped.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("engine build cancelled")]
    Cancelled,
    #[error("no base configuration found for the target network")]
    ConfigNotFound,
    #[error("invalid contract address in configuration: {0}")]
    InvalidAddress(String),
    #[error("network provider error: {0}")]
    Provider(eyre::Report),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Init(#[from] InitError),
    #[error("engine instance creation failed")]
    Create(#[source] EngineError),
}

impl BuildError {
    /// Cancellation is an expected outcome, not a failure to surface.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<eyre::Report> for BuildError {
    fn from(report: eyre::Report) -> Self {
        Self::Provider(report)
    }
}

/// Errors from creating or signing a decryption permit.
///
/// Addresses reach the permit layer already parsed, so the only failure
/// left is the signer refusing the typed-data request. Malformed address
/// strings surface earlier as [`BuildError::InvalidAddress`].
#[derive(Debug, Error)]
pub enum PermitError {
    #[error("signature rejected: {0}")]
    Signature(String),
}
