// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{sled_utils::get_or_open_db_tree, StringStorage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sled::Tree;
use std::path::Path;

/// Durable [`StringStorage`] backed by a sled tree.
pub struct SledStringStorage {
    tree: Tree,
}

impl SledStringStorage {
    pub fn open(path: &Path) -> Result<Self> {
        let tree = get_or_open_db_tree(path, "permits")?;
        Ok(Self { tree })
    }
}

#[async_trait]
impl StringStorage for SledStringStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .tree
            .get(key.as_bytes())
            .with_context(|| format!("Failed to fetch {}", key))?;
        value
            .map(|bytes| {
                String::from_utf8(bytes.to_vec()).context("Stored value is not valid utf-8")
            })
            .transpose()
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.tree
            .insert(key.as_bytes(), value.as_bytes())
            .context("Could not insert data into db")?;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.tree
            .remove(key.as_bytes())
            .context("Could not remove data from db")?;
        Ok(())
    }
}
