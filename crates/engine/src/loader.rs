// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Default CDN location of the relayer SDK bundle.
pub const RELAYER_SDK_CDN_URL: &str =
    "https://cdn.zama.ai/relayer-sdk-js/0.9.0/relayer-sdk-js.umd.cjs";

/// Errors from fetching or instantiating an SDK artifact.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read sdk bundle from {path}")]
    Local {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch sdk bundle from {url}")]
    Remote {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("every sdk source failed")]
    AllSourcesFailed,
    #[error("sdk backend rejected the artifact: {0}")]
    Backend(String),
}

/// A fetched SDK bundle, tagged with where it came from.
#[derive(Debug, Clone)]
pub struct SdkArtifact {
    pub origin: String,
    pub bytes: Vec<u8>,
}

/// One place an SDK bundle can be fetched from.
#[async_trait]
pub trait SdkSource: Send + Sync {
    fn describe(&self) -> String;
    async fn fetch(&self) -> Result<SdkArtifact, LoadError>;
}

/// Reads the bundle from the local filesystem.
pub struct LocalSdkSource {
    path: PathBuf,
}

impl LocalSdkSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SdkSource for LocalSdkSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<SdkArtifact, LoadError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| LoadError::Local {
                path: self.path.clone(),
                source,
            })?;
        Ok(SdkArtifact {
            origin: self.describe(),
            bytes,
        })
    }
}

/// Downloads the bundle from a CDN.
pub struct CdnSdkSource {
    url: Url,
    client: reqwest::Client,
}

impl CdnSdkSource {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

impl Default for CdnSdkSource {
    fn default() -> Self {
        // The constant is a valid URL, so this cannot fail.
        Self::new(Url::parse(RELAYER_SDK_CDN_URL).unwrap())
    }
}

#[async_trait]
impl SdkSource for CdnSdkSource {
    fn describe(&self) -> String {
        self.url.to_string()
    }

    async fn fetch(&self) -> Result<SdkArtifact, LoadError> {
        let remote = |source| LoadError::Remote {
            url: self.url.to_string(),
            source,
        };
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(remote)?
            .error_for_status()
            .map_err(remote)?;
        let bytes = response.bytes().await.map_err(remote)?;
        Ok(SdkArtifact {
            origin: self.describe(),
            bytes: bytes.to_vec(),
        })
    }
}

/// Fetches the SDK bundle from an ordered list of sources, first hit wins.
pub struct SdkLoader {
    sources: Vec<Box<dyn SdkSource>>,
}

impl Default for SdkLoader {
    fn default() -> Self {
        Self {
            sources: vec![Box::new(CdnSdkSource::default())],
        }
    }
}

impl SdkLoader {
    pub fn with_sources(sources: Vec<Box<dyn SdkSource>>) -> Self {
        Self { sources }
    }

    /// Prepend a local bundle so it is tried before any remote source.
    pub fn prefer_local(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.insert(0, Box::new(LocalSdkSource::new(path)));
        self
    }

    pub async fn load(&self) -> Result<SdkArtifact, LoadError> {
        for source in &self.sources {
            match source.fetch().await {
                Ok(artifact) => {
                    debug!(origin = %artifact.origin, size = artifact.bytes.len(), "Sdk bundle fetched");
                    return Ok(artifact);
                }
                Err(err) => {
                    warn!(source = %source.describe(), "Sdk source failed: {err}");
                }
            }
        }
        Err(LoadError::AllSourcesFailed)
    }
}
