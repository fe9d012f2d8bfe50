// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy::{
    network::Ethereum,
    providers::{Provider, ProviderBuilder},
};
use eyre::Result;
use std::{fmt, sync::Arc};

/// Where a session reaches its network: a bare RPC endpoint, or a provider
/// handle injected by the host application (the analogue of a browser
/// wallet's provider).
#[derive(Clone)]
pub enum NetworkTarget {
    Url(String),
    Shared(Arc<dyn Provider<Ethereum>>),
}

impl NetworkTarget {
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }

    pub fn shared(provider: Arc<dyn Provider<Ethereum>>) -> Self {
        Self::Shared(provider)
    }

    /// The RPC endpoint, known only for bare-URL targets.
    pub fn rpc_url(&self) -> Option<&str> {
        match self {
            Self::Url(url) => Some(url),
            Self::Shared(_) => None,
        }
    }

    /// Resolves this target to a usable provider handle.
    pub async fn connect(&self) -> Result<Arc<dyn Provider<Ethereum>>> {
        match self {
            Self::Url(url) => {
                let provider = ProviderBuilder::new().connect(url).await?;
                Ok(Arc::new(provider))
            }
            Self::Shared(provider) => Ok(provider.clone()),
        }
    }
}

impl fmt::Debug for NetworkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.debug_tuple("Url").field(url).finish(),
            Self::Shared(_) => f.debug_tuple("Shared").field(&"<provider>").finish(),
        }
    }
}
