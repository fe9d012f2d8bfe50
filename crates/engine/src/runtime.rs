// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{EngineError, EngineFactory, LoadError, SdkBackend, SdkLoader};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

/// Errors from initializing a loaded SDK.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("sdk is not loaded")]
    NotLoaded,
    #[error("sdk initialization failed")]
    Failed(#[source] EngineError),
}

#[derive(Default)]
struct RuntimeState {
    factory: Option<Arc<dyn EngineFactory>>,
    initialized: bool,
}

/// Holds the loaded-and-initialized state of one SDK backend.
///
/// Load and init are idempotent. The state mutex is held across the await,
/// so concurrent callers collapse into a single fetch or init.
pub struct SdkRuntime {
    backend: Arc<dyn SdkBackend>,
    state: Mutex<RuntimeState>,
}

impl SdkRuntime {
    pub fn new(backend: Arc<dyn SdkBackend>) -> Self {
        Self {
            backend,
            state: Mutex::new(RuntimeState::default()),
        }
    }

    pub async fn is_loaded(&self) -> bool {
        self.state.lock().await.factory.is_some()
    }

    pub async fn is_initialized(&self) -> bool {
        self.state.lock().await.initialized
    }

    /// Fetch the SDK bundle and instantiate its factory, once.
    pub async fn ensure_loaded(&self, loader: &SdkLoader) -> Result<(), LoadError> {
        let mut state = self.state.lock().await;
        if state.factory.is_some() {
            return Ok(());
        }
        let artifact = loader.load().await?;
        let factory = self.backend.instantiate(&artifact)?;
        info!(origin = %artifact.origin, "Sdk loaded");
        state.factory = Some(factory);
        Ok(())
    }

    /// Run the factory's global initialization, once.
    pub async fn ensure_initialized(&self) -> Result<(), InitError> {
        let mut state = self.state.lock().await;
        if state.initialized {
            return Ok(());
        }
        let factory = state.factory.clone().ok_or(InitError::NotLoaded)?;
        factory.init().await.map_err(InitError::Failed)?;
        info!("Sdk initialized");
        state.initialized = true;
        Ok(())
    }

    pub async fn factory(&self) -> Option<Arc<dyn EngineFactory>> {
        self.state.lock().await.factory.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FhevmEngine, InstanceParams, SdkArtifact};
    use async_trait::async_trait;
    use nebula_config::{ConfigVersion, InstanceConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFactory {
        inits: AtomicUsize,
    }

    #[async_trait]
    impl EngineFactory for CountingFactory {
        fn base_config(&self, _version: ConfigVersion) -> Option<InstanceConfig> {
            None
        }

        async fn init(&self) -> Result<(), EngineError> {
            self.inits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn create_instance(
            &self,
            _params: InstanceParams,
        ) -> Result<Arc<dyn FhevmEngine>, EngineError> {
            Err(EngineError::Internal("not under test".to_string()))
        }
    }

    struct CountingBackend {
        instantiations: AtomicUsize,
        factory: Arc<CountingFactory>,
    }

    impl SdkBackend for CountingBackend {
        fn instantiate(&self, _artifact: &SdkArtifact) -> Result<Arc<dyn EngineFactory>, LoadError> {
            self.instantiations.fetch_add(1, Ordering::SeqCst);
            Ok(self.factory.clone())
        }
    }

    fn runtime() -> (SdkRuntime, Arc<CountingBackend>) {
        let backend = Arc::new(CountingBackend {
            instantiations: AtomicUsize::new(0),
            factory: Arc::new(CountingFactory {
                inits: AtomicUsize::new(0),
            }),
        });
        (SdkRuntime::new(backend.clone()), backend)
    }

    fn loader_with_bundle(dir: &tempfile::TempDir) -> SdkLoader {
        let path = dir.path().join("bundle.cjs");
        std::fs::write(&path, b"bundle").unwrap();
        SdkLoader::with_sources(vec![Box::new(crate::LocalSdkSource::new(path))])
    }

    #[tokio::test]
    async fn load_and_init_happen_once() {
        let dir = tempfile::tempdir().unwrap();
        let (runtime, backend) = runtime();
        let loader = loader_with_bundle(&dir);

        assert!(!runtime.is_loaded().await);
        runtime.ensure_loaded(&loader).await.unwrap();
        runtime.ensure_loaded(&loader).await.unwrap();
        assert!(runtime.is_loaded().await);
        assert_eq!(backend.instantiations.load(Ordering::SeqCst), 1);

        assert!(!runtime.is_initialized().await);
        runtime.ensure_initialized().await.unwrap();
        runtime.ensure_initialized().await.unwrap();
        assert!(runtime.is_initialized().await);
        assert_eq!(backend.factory.inits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn init_requires_a_loaded_sdk() {
        let (runtime, _backend) = runtime();
        assert!(matches!(
            runtime.ensure_initialized().await,
            Err(InitError::NotLoaded)
        ));
    }
}
