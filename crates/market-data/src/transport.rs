//! Push transport state machine.
//!
//! Tracks exactly one of four states (disconnected, connecting,
//! connected, error) in a watch channel and drives reconnection with
//! capped exponential backoff. After the attempt budget is exhausted
//! the manager settles in `Error` and stays there until `reset`.

use crate::backoff::ExponentialBackoff;
use crate::error::{MarketDataError, Result};
use common::TransportState;
use config::ReconnectConfig;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Seam for the actual push connection.
///
/// The live adapter implements this against a real upstream; the demo
/// engine uses [`SimulatedTransport`].
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self) -> Result<()>;
    async fn disconnect(&self);
}

/// In-process transport that always connects
#[derive(Debug, Default)]
pub struct SimulatedTransport;

#[async_trait::async_trait]
impl Transport for SimulatedTransport {
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    async fn disconnect(&self) {}
}

struct TransportInner {
    transport: Arc<dyn Transport>,
    config: ReconnectConfig,
    state_tx: watch::Sender<TransportState>,
    /// Cancellation handle for the in-flight reconnect task, if any
    reconnect: Mutex<Option<CancellationToken>>,
}

impl TransportInner {
    fn set_state(&self, state: TransportState) {
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                debug!(from = ?current, to = ?state, "Transport state transition");
                *current = state;
                true
            }
        });
    }

    fn cancel_reconnect(&self) {
        if let Some(token) = self.reconnect.lock().take() {
            token.cancel();
        }
    }
}

/// Owns the push connection lifecycle.
///
/// Cheap to clone; all clones share the same state machine.
#[derive(Clone)]
pub struct TransportManager {
    inner: Arc<TransportInner>,
}

impl TransportManager {
    pub fn new(transport: Arc<dyn Transport>, config: ReconnectConfig) -> Self {
        let (state_tx, _) = watch::channel(TransportState::Disconnected);
        Self {
            inner: Arc::new(TransportInner {
                transport,
                config,
                state_tx,
                reconnect: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> TransportState {
        *self.inner.state_tx.borrow()
    }

    /// Watch every state transition
    pub fn watch_state(&self) -> watch::Receiver<TransportState> {
        self.inner.state_tx.subscribe()
    }

    /// Establish the connection. A failed attempt schedules background
    /// reconnects with exponential backoff.
    pub async fn connect(&self) -> Result<()> {
        self.inner.cancel_reconnect();
        self.inner.set_state(TransportState::Connecting);

        match self.inner.transport.connect().await {
            Ok(()) => {
                info!("Transport connected");
                self.inner.set_state(TransportState::Connected);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Transport connect failed, scheduling reconnects");
                self.inner.set_state(TransportState::Error);
                Self::spawn_reconnect(self.inner.clone());
                Err(e)
            }
        }
    }

    /// Called when an established connection drops
    pub fn notify_connection_lost(&self) {
        if self.state() != TransportState::Connected {
            return;
        }
        warn!("Transport connection lost");
        self.inner.set_state(TransportState::Disconnected);
        Self::spawn_reconnect(self.inner.clone());
    }

    /// Clear a settled `Error` state and try again with a fresh
    /// attempt budget
    pub async fn reset(&self) -> Result<()> {
        info!("Transport reset requested");
        self.connect().await
    }

    /// Cancel any pending reconnect and tear the connection down
    pub async fn shutdown(&self) {
        self.inner.cancel_reconnect();
        self.inner.transport.disconnect().await;
        self.inner.set_state(TransportState::Disconnected);
    }

    fn spawn_reconnect(inner: Arc<TransportInner>) {
        let token = CancellationToken::new();
        {
            let mut slot = inner.reconnect.lock();
            if let Some(old) = slot.take() {
                old.cancel();
            }
            *slot = Some(token.clone());
        }

        tokio::spawn(async move {
            let mut backoff = ExponentialBackoff::new(&inner.config);

            loop {
                let Some(delay) = backoff.next_delay() else {
                    warn!(
                        attempts = backoff.attempt(),
                        "Reconnect budget exhausted, settling in error until reset"
                    );
                    inner.set_state(TransportState::Error);
                    break;
                };

                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Reconnect cancelled");
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }

                inner.set_state(TransportState::Connecting);
                match inner.transport.connect().await {
                    Ok(()) => {
                        info!(attempt = backoff.attempt(), "Transport reconnected");
                        inner.set_state(TransportState::Connected);
                        break;
                    }
                    Err(e) => {
                        warn!(attempt = backoff.attempt(), error = %e, "Reconnect attempt failed");
                        inner.set_state(TransportState::Error);
                    }
                }
            }
        });
    }
}
