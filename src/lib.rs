//! Mesh signaling coordinator for multi-peer conference sessions
//!
//! This crate coordinates a full mesh of peer-to-peer media connections for
//! one shared session: it tracks per-peer negotiation state, serializes
//! asynchronous negotiation steps, routes offer/answer/candidate messages to
//! the right peer session, and tears failed or closed connections down
//! without leaking resources.
//!
//! The relay channel, the media negotiation engine and the capture hardware
//! are external collaborators consumed through capability traits
//! ([`SignalingChannel`], [`MediaConnector`], [`MediaDevices`],
//! [`IceServerProvider`]); the coordinator owns everything in between.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Session layer (rounds, scoring, UI)                     │
//! │  ↓ inbound signals / ↑ ConferenceEvent channel           │
//! │  ConferenceCoordinator                                   │
//! │  ├─ PeerRegistry (mesh of PeerSessions)                  │
//! │  │   └─ per-session event pump (candidates, tracks,      │
//! │  │      state changes, late sender caps)                 │
//! │  ├─ LocalMediaController (shared capture tracks)         │
//! │  └─ IceServerSet (discovery + STUN/TURN selection)       │
//! │     ↓ capability traits                                  │
//! │  relay channel · media engine · capture devices          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use conference_webrtc::ConferenceConfig;
//!
//! let config = ConferenceConfig::default();
//! assert!(config.validate().is_ok());
//! assert_eq!(config.bitrate.video_bps, 250_000);
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod coordinator;
pub mod error;
pub mod ice;
pub mod media;
pub mod peer;
pub mod signaling;

// Re-exports for public API
pub use config::{BitrateCaps, ConferenceConfig, IceConfig};
pub use coordinator::{ConferenceCoordinator, ConferenceEvent};
pub use error::{Error, Result};
pub use ice::{HttpIceServerProvider, IceServer, IceServerProvider, IceServerSet};
pub use media::devices::{LocalStream, LocalTrack, MediaConstraints, MediaDevices};
pub use media::local::LocalMediaController;
pub use media::{
    ConnectionEvent, ConnectionEvents, ConnectionState, EncodingParameters, MediaConnection,
    MediaConnector, MediaSender, RemoteStream, RemoteTrack, SenderParameters, TrackKind,
};
pub use peer::{NegotiationRole, PeerRegistry, PeerSession};
pub use signaling::protocol::{
    IceCandidateInit, InboundSignal, SdpType, SessionDescription, SignalingMessage,
};
pub use signaling::SignalingChannel;

/// Get the version of this crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
