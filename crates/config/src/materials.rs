// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use serde::{Deserialize, Serialize};

/// Security parameter used when reading public params back from a fresh
/// engine instance.
pub const DEFAULT_PARAMS_BITS: u32 = 2048;

/// The engine's public key together with the identifier the relayer assigned
/// to it.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct PublicKeyMaterial {
    pub id: String,
    pub data: Vec<u8>,
}

/// Public cryptographic parameters for a given security level.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct PublicParamsMaterial {
    pub bits: u32,
    pub data: Vec<u8>,
}
