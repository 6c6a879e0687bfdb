//! Per-peer negotiation session

use crate::media::{ConnectionState, MediaConnection};
use crate::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

/// Which side initiated the current exchange. Diagnostics only; description
/// sequencing is validated by the media transport itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationRole {
    /// No exchange started yet
    None,
    /// This side sent the offer
    Offerer,
    /// This side answered a remote offer
    Answerer,
}

/// One remote participant's negotiation state and media connection.
///
/// The session owns its connection exclusively; the registry is the only
/// place sessions are created or removed.
pub struct PeerSession {
    peer_id: String,
    connection: Arc<dyn MediaConnection>,
    role: Mutex<NegotiationRole>,
    state: Mutex<ConnectionState>,
    connected_at: Mutex<Option<Instant>>,
    /// Serializes signaling-message handling for this peer: each inbound
    /// message is handled to completion before the next one starts, while
    /// different peers proceed concurrently.
    negotiation: tokio::sync::Mutex<()>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl PeerSession {
    pub(crate) fn new(peer_id: &str, connection: Arc<dyn MediaConnection>) -> Arc<Self> {
        Arc::new(Self {
            peer_id: peer_id.to_string(),
            connection,
            role: Mutex::new(NegotiationRole::None),
            state: Mutex::new(ConnectionState::New),
            connected_at: Mutex::new(None),
            negotiation: tokio::sync::Mutex::new(()),
            pump: Mutex::new(None),
        })
    }

    /// The remote peer's identifier
    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    /// The session's media connection. Crate-internal: all negotiation goes
    /// through the coordinator so the registry stays the sole mutator.
    pub(crate) fn connection(&self) -> &Arc<dyn MediaConnection> {
        &self.connection
    }

    /// Last state reported by the connection
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Which side initiated the current exchange
    pub fn role(&self) -> NegotiationRole {
        *self.role.lock()
    }

    /// Time since the connection reached `Connected`, if it has
    pub fn connection_duration(&self) -> Option<Duration> {
        self.connected_at.lock().map(|at| at.elapsed())
    }

    pub(crate) fn set_role(&self, role: NegotiationRole) {
        *self.role.lock() = role;
    }

    pub(crate) fn record_state(&self, new_state: ConnectionState) {
        let mut state = self.state.lock();
        let old_state = *state;
        if old_state != new_state {
            debug!(
                "peer {} state transition: {} -> {}",
                self.peer_id, old_state, new_state
            );
            *state = new_state;
            if new_state == ConnectionState::Connected {
                *self.connected_at.lock() = Some(Instant::now());
            }
        }
    }

    /// Hold the per-peer handling guard for the duration of one operation
    pub(crate) async fn serialize_handling(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.negotiation.lock().await
    }

    pub(crate) fn attach_pump(&self, handle: JoinHandle<()>) {
        *self.pump.lock() = Some(handle);
    }

    /// Stop the event pump and close the connection
    pub(crate) async fn close(&self) -> Result<()> {
        if let Some(pump) = self.pump.lock().take() {
            pump.abort();
        }
        self.connection.close().await
    }
}
