//! Media transport capability boundary
//!
//! The actual negotiation engine (SDP, ICE gathering, DTLS, media pipes) lives
//! outside this crate. The coordinator drives it through [`MediaConnection`]
//! and observes it through the per-connection event channel handed out by
//! [`MediaConnector::connect`].

pub mod devices;
pub mod local;

use crate::ice::IceServerSet;
use crate::signaling::protocol::{IceCandidateInit, SessionDescription};
use crate::Result;
use async_trait::async_trait;
use devices::LocalTrack;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Media kind of a track or sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Audio track
    Audio,
    /// Video track
    Video,
}

impl TrackKind {
    /// Lowercase wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Audio => "audio",
            TrackKind::Video => "video",
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection lifecycle state, mirrored from the media transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Initial state, negotiation not yet started
    New,
    /// Connection negotiation in progress
    Connecting,
    /// Connection established
    Connected,
    /// Connectivity lost, may still recover inside the transport
    Disconnected,
    /// Connection failed
    Failed,
    /// Connection closed
    Closed,
}

impl ConnectionState {
    /// Whether the state ends the session (triggers automatic removal)
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Failed | ConnectionState::Closed)
    }

    /// Lowercase wire name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::New => "new",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Failed => "failed",
            ConnectionState::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A media track received from a remote peer
#[derive(Debug, Clone)]
pub struct RemoteTrack {
    /// Track identifier assigned by the remote side
    pub id: String,

    /// Media kind
    pub kind: TrackKind,
}

/// The remote stream a received track belongs to
#[derive(Debug, Clone)]
pub struct RemoteStream {
    /// Stream identifier assigned by the remote side
    pub id: String,
}

/// One encoding of an outbound sender
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodingParameters {
    /// Maximum bitrate in bits per second, unlimited when absent
    pub max_bitrate: Option<u32>,
}

/// Mutable parameters of an outbound sender
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderParameters {
    /// Active encodings; may be empty before negotiation settles
    pub encodings: Vec<EncodingParameters>,
}

/// An outbound media sender exposed by a connection
pub trait MediaSender: Send + Sync {
    /// Media kind this sender carries
    fn kind(&self) -> TrackKind;

    /// Read the sender's current parameters
    fn parameters(&self) -> SenderParameters;

    /// Replace the sender's parameters
    fn set_parameters(&self, parameters: SenderParameters) -> Result<()>;
}

/// Events reported by a media connection after creation.
///
/// Each connection gets its own channel, subscribed at session creation and
/// dropped at removal; candidate/track/state callbacks of the underlying
/// engine are adapted into it by the [`MediaConnector`] implementation.
pub enum ConnectionEvent {
    /// A locally discovered ICE candidate that must be relayed to the peer
    LocalCandidate(IceCandidateInit),

    /// The connection moved to a new lifecycle state
    StateChange(ConnectionState),

    /// A remote track arrived together with its stream
    RemoteTrack {
        /// The received track
        track: RemoteTrack,
        /// The stream it belongs to
        stream: RemoteStream,
    },

    /// An outbound sender became available for parameter updates
    SenderReady(Arc<dyn MediaSender>),
}

impl fmt::Debug for ConnectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionEvent::LocalCandidate(c) => f.debug_tuple("LocalCandidate").field(c).finish(),
            ConnectionEvent::StateChange(s) => f.debug_tuple("StateChange").field(s).finish(),
            ConnectionEvent::RemoteTrack { track, stream } => f
                .debug_struct("RemoteTrack")
                .field("track", track)
                .field("stream", stream)
                .finish(),
            ConnectionEvent::SenderReady(s) => {
                f.debug_tuple("SenderReady").field(&s.kind()).finish()
            }
        }
    }
}

/// Receiving side of a connection's event channel
pub type ConnectionEvents = mpsc::UnboundedReceiver<ConnectionEvent>;

/// One peer-to-peer media connection, exclusively owned by its session.
///
/// Descriptions created locally are also applied locally before they are
/// returned, matching the engine's own signaling-state bookkeeping; this
/// crate does not re-implement description sequencing.
#[async_trait]
pub trait MediaConnection: Send + Sync {
    /// Create a local offer and apply it as the local description.
    async fn create_offer(&self) -> Result<SessionDescription>;

    /// Create a local answer to the previously applied remote offer and apply
    /// it as the local description.
    async fn create_answer(&self) -> Result<SessionDescription>;

    /// Apply a remote offer or answer.
    async fn apply_remote_description(&self, description: SessionDescription) -> Result<()>;

    /// Add a candidate received from the remote peer.
    async fn add_remote_candidate(&self, candidate: IceCandidateInit) -> Result<()>;

    /// Outbound senders currently known to the connection.
    fn senders(&self) -> Vec<Arc<dyn MediaSender>>;

    /// Close the connection and release its resources.
    async fn close(&self) -> Result<()>;
}

/// Factory for per-peer media connections
#[async_trait]
pub trait MediaConnector: Send + Sync {
    /// Create a connection for `peer_id`, seeded with the given ICE servers
    /// and carrying the given local tracks, and return it together with its
    /// event channel.
    async fn connect(
        &self,
        peer_id: &str,
        ice_servers: &IceServerSet,
        local_tracks: &[Arc<LocalTrack>],
    ) -> Result<(Arc<dyn MediaConnection>, ConnectionEvents)>;
}
