// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{create_engine, BuildError, BuildRequest, EngineStack};
use nebula_config::MockChains;
use nebula_engine::FhevmEngine;
use nebula_evm::NetworkTarget;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Loading,
    Ready,
    Error,
}

/// Observable session state. `handle` is set exactly in `Ready`, `error`
/// exactly in `Error`.
#[derive(Clone)]
pub struct SessionState {
    pub status: SessionStatus,
    pub handle: Option<Arc<dyn FhevmEngine>>,
    pub error: Option<Arc<BuildError>>,
}

impl SessionState {
    fn idle() -> Self {
        Self {
            status: SessionStatus::Idle,
            handle: None,
            error: None,
        }
    }

    fn loading() -> Self {
        Self {
            status: SessionStatus::Loading,
            handle: None,
            error: None,
        }
    }

    fn ready(handle: Arc<dyn FhevmEngine>) -> Self {
        Self {
            status: SessionStatus::Ready,
            handle: Some(handle),
            error: None,
        }
    }

    fn failed(error: BuildError) -> Self {
        Self {
            status: SessionStatus::Error,
            handle: None,
            error: Some(Arc::new(error)),
        }
    }
}

struct WorkState {
    network: Option<NetworkTarget>,
    enabled: bool,
    token: CancellationToken,
}

struct SessionInner {
    stack: EngineStack,
    mock_chains: MockChains,
    state_tx: watch::Sender<SessionState>,
    work: Mutex<WorkState>,
}

/// Supervises one engine session: reacts to network and enablement changes
/// by cancelling the in-flight build and starting a fresh one, and publishes
/// the resulting state over a watch channel.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

impl SessionManager {
    pub fn new(stack: EngineStack, mock_chains: MockChains) -> Self {
        let (state_tx, _) = watch::channel(SessionState::idle());
        Self {
            inner: Arc::new(SessionInner {
                stack,
                mock_chains,
                state_tx,
                work: Mutex::new(WorkState {
                    network: None,
                    enabled: true,
                    token: CancellationToken::new(),
                }),
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state_tx.subscribe()
    }

    /// Point the session at a new network, or detach it with `None`.
    pub async fn set_network(&self, network: Option<NetworkTarget>) {
        let mut work = self.inner.work.lock().await;
        work.network = network;
        self.restart(&mut work);
    }

    /// Pause or resume the session. Disabling cancels any in-flight build.
    pub async fn set_enabled(&self, enabled: bool) {
        let mut work = self.inner.work.lock().await;
        if work.enabled == enabled {
            return;
        }
        work.enabled = enabled;
        self.restart(&mut work);
    }

    /// Discard the current engine and rebuild against the same network.
    pub async fn refresh(&self) {
        let mut work = self.inner.work.lock().await;
        self.restart(&mut work);
    }

    fn restart(&self, work: &mut WorkState) {
        work.token.cancel();
        work.token = CancellationToken::new();

        let Some(network) = work.network.clone() else {
            self.inner.state_tx.send_replace(SessionState::idle());
            return;
        };
        if !work.enabled {
            self.inner.state_tx.send_replace(SessionState::idle());
            return;
        }

        self.inner.state_tx.send_replace(SessionState::loading());
        let inner = self.inner.clone();
        let token = work.token.clone();
        tokio::spawn(async move {
            let (status_tx, mut status_rx) = mpsc::unbounded_channel();
            tokio::spawn(async move {
                while let Some(status) = status_rx.recv().await {
                    debug!(%status, "Engine build progress");
                }
            });

            let request = BuildRequest {
                network,
                mock_chains: inner.mock_chains.clone(),
                cancel: token.clone(),
                status: Some(status_tx),
            };
            let result = create_engine(&inner.stack, &request).await;

            // Restarts cancel the token and publish their own state while
            // holding the work lock, so the staleness check and the publish
            // below must happen under the same lock or a stale success could
            // land after a newer restart's state.
            let _work = inner.work.lock().await;
            if token.is_cancelled() {
                return;
            }
            match result {
                Ok(handle) => {
                    info!("Engine session ready");
                    inner.state_tx.send_replace(SessionState::ready(handle));
                }
                Err(err) if err.is_cancelled() => {}
                Err(err) => {
                    error!("Engine build failed: {err}");
                    inner.state_tx.send_replace(SessionState::failed(err));
                }
            }
        });
    }
}
