//! Signaling coordinator
//!
//! Orchestrates offer/answer/candidate exchange for a mesh of peer
//! connections: every pair of participants negotiates independently and
//! symmetrically, with the already-present participant always offering to the
//! newcomer. Failures stay per-peer; there is no global failure state.

pub mod bandwidth;

use crate::config::ConferenceConfig;
use crate::ice::{IceServerProvider, IceServerSet};
use crate::media::devices::{LocalStream, MediaDevices};
use crate::media::local::LocalMediaController;
use crate::media::{ConnectionState, MediaConnector, RemoteStream, RemoteTrack};
use crate::peer::{NegotiationRole, PeerRegistry};
use crate::signaling::protocol::{
    IceCandidateInit, InboundSignal, SdpType, SessionDescription, SignalingMessage,
};
use crate::signaling::SignalingChannel;
use crate::{Error, Result};
use std::sync::{Arc, OnceLock};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Events surfaced to the embedding session layer.
///
/// Delivered on the channel supplied at construction; pure notification
/// relay, nothing is buffered here.
#[derive(Debug, Clone)]
pub enum ConferenceEvent {
    /// A peer's connection moved to a new state. Terminal states have already
    /// scheduled the session's removal when this is observed.
    PeerStateChanged {
        /// The peer whose connection changed
        peer_id: String,
        /// The new state
        state: ConnectionState,
    },

    /// A remote track arrived for a peer
    RemoteTrackAdded {
        /// The peer the track came from
        peer_id: String,
        /// The received track
        track: RemoteTrack,
        /// The stream it belongs to
        stream: RemoteStream,
    },
}

/// Mesh signaling coordinator for one conference session.
///
/// Owns the peer session registry and the local media controller; talks to
/// the relay channel, the media transport and the capture hardware through
/// the capability traits supplied at construction.
pub struct ConferenceCoordinator {
    config: ConferenceConfig,
    signaling: Arc<dyn SignalingChannel>,
    ice_provider: Arc<dyn IceServerProvider>,
    ice_servers: Arc<OnceLock<IceServerSet>>,
    media: Arc<LocalMediaController>,
    registry: Arc<PeerRegistry>,
}

impl ConferenceCoordinator {
    /// Create a coordinator over the given capabilities. Conference events
    /// are delivered on `events`.
    pub fn new(
        config: ConferenceConfig,
        signaling: Arc<dyn SignalingChannel>,
        connector: Arc<dyn MediaConnector>,
        devices: Arc<dyn MediaDevices>,
        ice_provider: Arc<dyn IceServerProvider>,
        events: mpsc::UnboundedSender<ConferenceEvent>,
    ) -> Result<Self> {
        config.validate()?;

        let ice_servers = Arc::new(OnceLock::new());
        let media = Arc::new(LocalMediaController::new(devices));
        let registry = PeerRegistry::new(
            connector,
            Arc::clone(&signaling),
            events,
            config.bitrate,
            Arc::clone(&media),
            Arc::clone(&ice_servers),
        );

        Ok(Self {
            config,
            signaling,
            ice_provider,
            ice_servers,
            media,
            registry,
        })
    }

    /// Discover ICE servers and acquire local capture. Must complete before
    /// any peer session can be created. ICE discovery failure falls back to
    /// the configured STUN-only set and is never propagated; capture failure
    /// is.
    pub async fn initialize(&self, voice_only: bool) -> Result<Arc<LocalStream>> {
        let servers = match self.ice_provider.fetch_ice_servers().await {
            Ok(fetched) => IceServerSet::from_fetched(fetched, &self.config.ice),
            Err(e) => {
                warn!("ICE server discovery failed, using fallback: {}", e);
                IceServerSet::fallback(&self.config.ice)
            }
        };

        // The set is immutable once sessions may exist; a repeated
        // initialize keeps the first one.
        if self.ice_servers.set(servers).is_err() {
            debug!("ICE server set already initialized, keeping existing set");
        }

        self.media.initialize(&self.config.media, voice_only).await
    }

    /// React to a new participant: the existing participant always initiates.
    /// Offering from both sides would deadlock the pair, so the newcomer
    /// never offers first.
    pub async fn handle_peer_joined(&self, peer_id: &str) -> Result<()> {
        info!("peer {} joined, sending offer", peer_id);
        self.create_offer(peer_id).await
    }

    /// Create (or reuse) the session for `peer_id`, produce a local offer and
    /// push it over the relay. A failed push is surfaced as a delivery error;
    /// the local description is not rolled back.
    pub async fn create_offer(&self, peer_id: &str) -> Result<()> {
        let session = self.registry.get_or_create(peer_id).await?;
        let _guard = session.serialize_handling().await;

        session.set_role(NegotiationRole::Offerer);
        let offer = match session.connection().create_offer().await {
            Ok(offer) => offer,
            Err(e) => return self.recover_if_removed(peer_id, e).await,
        };

        debug!("created offer for {}", peer_id);
        self.signaling
            .push(SignalingMessage::Offer {
                target: peer_id.to_string(),
                offer,
            })
            .await
    }

    /// Apply a remote offer, produce a local answer and push it back. Creates
    /// the session if the remote side offered before we knew the peer.
    pub async fn handle_offer(&self, peer_id: &str, offer: SessionDescription) -> Result<()> {
        if offer.kind != SdpType::Offer {
            return Err(Error::Protocol(format!(
                "expected an offer from {}, got {:?}",
                peer_id, offer.kind
            )));
        }

        let session = self.registry.get_or_create(peer_id).await?;
        let _guard = session.serialize_handling().await;

        session.set_role(NegotiationRole::Answerer);
        if let Err(e) = session.connection().apply_remote_description(offer).await {
            return self.recover_if_removed(peer_id, e).await;
        }
        let answer = match session.connection().create_answer().await {
            Ok(answer) => answer,
            Err(e) => return self.recover_if_removed(peer_id, e).await,
        };

        debug!("created answer for {}", peer_id);
        self.signaling
            .push(SignalingMessage::Answer {
                target: peer_id.to_string(),
                answer,
            })
            .await
    }

    /// Apply a remote answer to a previously sent offer. An answer for an
    /// unknown peer is a stale or duplicate message (or a protocol violation
    /// by the remote side): logged and dropped, never fatal.
    pub async fn handle_answer(&self, peer_id: &str, answer: SessionDescription) -> Result<()> {
        if answer.kind != SdpType::Answer {
            return Err(Error::Protocol(format!(
                "expected an answer from {}, got {:?}",
                peer_id, answer.kind
            )));
        }

        let Some(session) = self.registry.get(peer_id).await else {
            warn!("dropping answer from unknown peer {}", peer_id);
            return Ok(());
        };
        let _guard = session.serialize_handling().await;

        if let Err(e) = session.connection().apply_remote_description(answer).await {
            return self.recover_if_removed(peer_id, e).await;
        }
        Ok(())
    }

    /// Apply a remote candidate. Candidates can race ahead of session
    /// creation in pathological orderings; without a session they are dropped
    /// (no buffering or replay).
    pub async fn handle_ice_candidate(
        &self,
        peer_id: &str,
        candidate: IceCandidateInit,
    ) -> Result<()> {
        let Some(session) = self.registry.get(peer_id).await else {
            warn!("dropping ICE candidate from unknown peer {}", peer_id);
            return Ok(());
        };
        let _guard = session.serialize_handling().await;

        if let Err(e) = session.connection().add_remote_candidate(candidate).await {
            return self.recover_if_removed(peer_id, e).await;
        }
        Ok(())
    }

    /// Route a parsed inbound signal to its handler
    pub async fn handle_signal(&self, signal: InboundSignal) -> Result<()> {
        match signal {
            InboundSignal::Offer { sender_id, offer } => {
                self.handle_offer(&sender_id, offer).await
            }
            InboundSignal::Answer { sender_id, answer } => {
                self.handle_answer(&sender_id, answer).await
            }
            InboundSignal::IceCandidate {
                sender_id,
                candidate,
            } => self.handle_ice_candidate(&sender_id, candidate).await,
        }
    }

    /// Flip the local video track; see [`LocalMediaController::toggle_camera`]
    pub fn toggle_camera(&self) -> bool {
        self.media.toggle_camera()
    }

    /// Flip the local audio track; see
    /// [`LocalMediaController::toggle_microphone`]
    pub fn toggle_microphone(&self) -> bool {
        self.media.toggle_microphone()
    }

    /// Last observed video-enabled state
    pub fn is_camera_enabled(&self) -> bool {
        self.media.is_camera_enabled()
    }

    /// Last observed audio-enabled state
    pub fn is_microphone_enabled(&self) -> bool {
        self.media.is_microphone_enabled()
    }

    /// The local capture stream, if initialized
    pub fn local_stream(&self) -> Option<Arc<LocalStream>> {
        self.media.stream()
    }

    /// Close and forget one peer's session; unknown peers are a no-op
    pub async fn remove_peer(&self, peer_id: &str) {
        self.registry.remove(peer_id).await;
    }

    /// Number of known peer sessions
    pub async fn peer_count(&self) -> usize {
        self.registry.peer_count().await
    }

    /// Whether a session exists for `peer_id`
    pub async fn has_peer(&self, peer_id: &str) -> bool {
        self.registry.has_peer(peer_id).await
    }

    /// Snapshot of every peer's last reported connection state
    pub async fn peer_states(&self) -> Vec<(String, ConnectionState)> {
        self.registry.peer_states().await
    }

    /// The peer session registry, for read-only diagnostics
    pub fn registry(&self) -> &Arc<PeerRegistry> {
        &self.registry
    }

    /// Close every peer session and stop local capture. Best-effort and
    /// idempotent: safe to call repeatedly and before initialization, and it
    /// always runs to completion even if individual closes fail.
    pub async fn destroy(&self) {
        self.registry.remove_all().await;
        self.media.destroy();
        info!("conference coordinator destroyed");
    }

    /// A session removed while one of its operations was in flight makes the
    /// operation's failure meaningless: treat it as a no-op instead of
    /// surfacing an error for a peer that no longer exists.
    async fn recover_if_removed(&self, peer_id: &str, error: Error) -> Result<()> {
        if self.registry.get(peer_id).await.is_none() {
            debug!(
                "ignoring negotiation failure for removed peer {}: {}",
                peer_id, error
            );
            return Ok(());
        }
        Err(error)
    }
}
