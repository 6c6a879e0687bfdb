//! Peer session registry
//!
//! Single source of truth for "do we have a connection to peer X and in what
//! state". All session creation and removal goes through here; nothing else
//! mutates the peer map.

use super::session::PeerSession;
use crate::config::{BitrateCaps, IceConfig};
use crate::coordinator::{bandwidth, ConferenceEvent};
use crate::ice::IceServerSet;
use crate::media::local::LocalMediaController;
use crate::media::{ConnectionEvent, ConnectionEvents, MediaConnector};
use crate::signaling::protocol::SignalingMessage;
use crate::signaling::SignalingChannel;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

/// Registry of peer sessions for one conference
pub struct PeerRegistry {
    sessions: RwLock<HashMap<String, Arc<PeerSession>>>,
    connector: Arc<dyn MediaConnector>,
    signaling: Arc<dyn SignalingChannel>,
    events: mpsc::UnboundedSender<ConferenceEvent>,
    caps: BitrateCaps,
    media: Arc<LocalMediaController>,
    ice_servers: Arc<OnceLock<IceServerSet>>,
}

impl PeerRegistry {
    pub(crate) fn new(
        connector: Arc<dyn MediaConnector>,
        signaling: Arc<dyn SignalingChannel>,
        events: mpsc::UnboundedSender<ConferenceEvent>,
        caps: BitrateCaps,
        media: Arc<LocalMediaController>,
        ice_servers: Arc<OnceLock<IceServerSet>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            connector,
            signaling,
            events,
            caps,
            media,
            ice_servers,
        })
    }

    /// Return the existing session for `peer_id`, or create one seeded with
    /// the current local tracks and ICE server set. Idempotent: repeated
    /// calls for the same peer never create a duplicate connection. The map's
    /// write guard is held across construction, so concurrent calls for the
    /// same peer cannot race.
    pub async fn get_or_create(self: &Arc<Self>, peer_id: &str) -> Result<Arc<PeerSession>> {
        let mut sessions = self.sessions.write().await;

        if let Some(existing) = sessions.get(peer_id) {
            return Ok(Arc::clone(existing));
        }

        let local_tracks = self.media.tracks();
        if local_tracks.is_empty() {
            return Err(Error::Media(
                "local media has not been initialized".to_string(),
            ));
        }

        // Initialization populates the set before any local tracks exist.
        let ice_servers = self
            .ice_servers
            .get()
            .cloned()
            .unwrap_or_else(|| IceServerSet::fallback(&IceConfig::default()));

        let (connection, events) = self
            .connector
            .connect(peer_id, &ice_servers, &local_tracks)
            .await?;

        let session = PeerSession::new(peer_id, connection);

        // Senders exist as soon as tracks are added, so cap them right away;
        // late senders are capped again from the event pump.
        bandwidth::apply_connection_caps(session.connection().as_ref(), &self.caps);

        session.attach_pump(spawn_event_pump(self, &session, events));
        sessions.insert(peer_id.to_string(), Arc::clone(&session));

        info!("created peer session for {}", peer_id);
        Ok(session)
    }

    /// Look up a session without creating one
    pub async fn get(&self, peer_id: &str) -> Option<Arc<PeerSession>> {
        self.sessions.read().await.get(peer_id).cloned()
    }

    /// Close and forget the session for `peer_id`. Removing an unknown or
    /// already-removed peer is a no-op.
    pub async fn remove(&self, peer_id: &str) {
        let session = self.sessions.write().await.remove(peer_id);

        match session {
            Some(session) => {
                info!("removing peer session for {}", peer_id);
                if let Err(e) = session.close().await {
                    warn!("error closing connection for {}: {}", peer_id, e);
                }
            }
            None => debug!("remove for unknown peer {} ignored", peer_id),
        }
    }

    /// Close every session. Best-effort: a failing close is logged and the
    /// sweep continues.
    pub async fn remove_all(&self) {
        let sessions: Vec<(String, Arc<PeerSession>)> =
            self.sessions.write().await.drain().collect();

        for (peer_id, session) in sessions {
            debug!("closing connection for peer {}", peer_id);
            if let Err(e) = session.close().await {
                warn!("error closing peer {}: {}", peer_id, e);
            }
        }
    }

    /// Number of known sessions
    pub async fn peer_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether a session exists for `peer_id`
    pub async fn has_peer(&self, peer_id: &str) -> bool {
        self.sessions.read().await.contains_key(peer_id)
    }

    /// Snapshot of every session's last reported state
    pub async fn peer_states(&self) -> Vec<(String, crate::media::ConnectionState)> {
        self.sessions
            .read()
            .await
            .iter()
            .map(|(peer_id, session)| (peer_id.clone(), session.state()))
            .collect()
    }
}

/// Forward connection events for one session: local candidates to the relay,
/// remote tracks and state changes to the caller, bitrate caps to late
/// senders. A terminal state schedules removal and ends the pump, so nothing
/// can be reported for this session afterwards.
fn spawn_event_pump(
    registry: &Arc<PeerRegistry>,
    session: &Arc<PeerSession>,
    mut events: ConnectionEvents,
) -> tokio::task::JoinHandle<()> {
    // Weak on both ends: the task must not keep the session (and through it
    // the connection and this very event channel) alive once the registry
    // lets go of it.
    let registry = Arc::downgrade(registry);
    let session = Arc::downgrade(session);

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let Some(registry) = Weak::upgrade(&registry) else {
                break;
            };
            let Some(session) = Weak::upgrade(&session) else {
                break;
            };

            match event {
                ConnectionEvent::LocalCandidate(candidate) => {
                    let message = SignalingMessage::IceCandidate {
                        target: session.peer_id().to_string(),
                        candidate,
                    };
                    if let Err(e) = registry.signaling.push(message).await {
                        warn!(
                            "dropping local ICE candidate for {} after failed delivery: {}",
                            session.peer_id(),
                            e
                        );
                    }
                }
                ConnectionEvent::SenderReady(sender) => {
                    bandwidth::apply_sender_cap(sender.as_ref(), &registry.caps);
                }
                ConnectionEvent::RemoteTrack { track, stream } => {
                    let _ = registry.events.send(ConferenceEvent::RemoteTrackAdded {
                        peer_id: session.peer_id().to_string(),
                        track,
                        stream,
                    });
                }
                ConnectionEvent::StateChange(state) => {
                    session.record_state(state);
                    let _ = registry.events.send(ConferenceEvent::PeerStateChanged {
                        peer_id: session.peer_id().to_string(),
                        state,
                    });

                    if state.is_terminal() {
                        // Removal runs on its own task: `remove` aborts this
                        // pump, which must not cancel the removal itself.
                        let peer_id = session.peer_id().to_string();
                        tokio::spawn(async move {
                            registry.remove(&peer_id).await;
                        });
                        break;
                    }
                }
            }
        }
    })
}
