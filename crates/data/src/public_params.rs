// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::sled_utils::get_or_open_db_tree;
use alloy_primitives::Address;
use nebula_config::{PublicKeyMaterial, PublicParamsMaterial};
use sled::Tree;
use std::path::Path;
use tracing::warn;

const PUBLIC_KEY_TREE: &str = "public-keys";
const PUBLIC_PARAMS_TREE: &str = "public-params";

/// Cached public material for one access-control contract.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublicParamsEntry {
    pub public_key: Option<PublicKeyMaterial>,
    pub public_params: Option<PublicParamsMaterial>,
}

/// Persistent cache of the engine's public key and public parameters, keyed
/// by ACL contract address.
///
/// The cache is an optimization, never a correctness requirement: when the
/// backing store cannot be opened the cache degrades to disabled, where
/// reads return an empty entry and writes are dropped. Read/write failures
/// on a live store are logged and swallowed for the same reason.
pub struct PublicParamsStore {
    trees: Option<Trees>,
}

struct Trees {
    keys: Tree,
    params: Tree,
}

impl PublicParamsStore {
    /// Opens the store at `path`, degrading to disabled if sled refuses.
    pub fn open(path: &Path) -> Self {
        let keys = get_or_open_db_tree(path, PUBLIC_KEY_TREE);
        let params = get_or_open_db_tree(path, PUBLIC_PARAMS_TREE);
        match (keys, params) {
            (Ok(keys), Ok(params)) => Self {
                trees: Some(Trees { keys, params }),
            },
            (Err(err), _) | (_, Err(err)) => {
                warn!("Public params cache unavailable, continuing without: {err}");
                Self::disabled()
            }
        }
    }

    /// A store that never persists anything.
    pub fn disabled() -> Self {
        Self { trees: None }
    }

    /// An ephemeral store for environments without durable storage.
    pub fn in_memory() -> Self {
        let db = match sled::Config::new().temporary(true).open() {
            Ok(db) => db,
            Err(err) => {
                warn!("Could not open temporary sled db: {err}");
                return Self::disabled();
            }
        };
        match (db.open_tree(PUBLIC_KEY_TREE), db.open_tree(PUBLIC_PARAMS_TREE)) {
            (Ok(keys), Ok(params)) => Self {
                trees: Some(Trees { keys, params }),
            },
            (Err(err), _) | (_, Err(err)) => {
                warn!("Could not open temporary trees: {err}");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.trees.is_some()
    }

    /// Reads the cached material for `acl`. Absent or unreadable entries are
    /// cache misses, never errors.
    pub async fn get(&self, acl: Address) -> PublicParamsEntry {
        let Some(trees) = &self.trees else {
            return PublicParamsEntry::default();
        };
        PublicParamsEntry {
            public_key: read_entry(&trees.keys, acl),
            public_params: read_entry(&trees.params, acl),
        }
    }

    /// Stores the given material for `acl`. `None` fields leave the existing
    /// entry untouched; failures are logged and swallowed.
    pub async fn set(
        &self,
        acl: Address,
        public_key: Option<&PublicKeyMaterial>,
        public_params: Option<&PublicParamsMaterial>,
    ) {
        let Some(trees) = &self.trees else {
            return;
        };
        if let Some(public_key) = public_key {
            write_entry(&trees.keys, acl, public_key);
        }
        if let Some(public_params) = public_params {
            write_entry(&trees.params, acl, public_params);
        }
    }
}

fn read_entry<T: serde::de::DeserializeOwned>(tree: &Tree, acl: Address) -> Option<T> {
    let bytes = match tree.get(acl.as_slice()) {
        Ok(bytes) => bytes?,
        Err(err) => {
            warn!(%acl, "Failed to read public params cache: {err}");
            return None;
        }
    };
    match bincode::deserialize(&bytes) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(%acl, "Discarding undecodable public params entry: {err}");
            None
        }
    }
}

fn write_entry<T: serde::Serialize>(tree: &Tree, acl: Address, value: &T) {
    let serialized = match bincode::serialize(value) {
        Ok(serialized) => serialized,
        Err(err) => {
            warn!(%acl, "Could not serialize public params entry: {err}");
            return;
        }
    };
    if let Err(err) = tree.insert(acl.as_slice(), serialized) {
        warn!(%acl, "Failed to persist public params entry: {err}");
    }
}
