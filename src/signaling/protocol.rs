//! Signaling protocol types
//!
//! Wire payloads mirror the browser shapes (`{type, sdp}` descriptions and
//! `{candidate, sdpMid, sdpMLineIndex}` candidates) so the coordinator can
//! interoperate with browser peers over the same relay channel.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Which side of a negotiation a session description belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    /// Locally created offer
    Offer,
    /// Locally created answer
    Answer,
}

/// A negotiation description exchanged between two peers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// Description kind
    #[serde(rename = "type")]
    pub kind: SdpType,

    /// SDP body
    pub sdp: String,
}

impl SessionDescription {
    /// Create an offer description
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    /// Create an answer description
    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// A network-path descriptor proposed during connectivity establishment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidateInit {
    /// Candidate string (empty signals end of gathering)
    pub candidate: String,

    /// SDP media line identifier
    #[serde(rename = "sdpMid", default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,

    /// SDP media line index
    #[serde(
        rename = "sdpMLineIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_mline_index: Option<u16>,
}

/// Outbound signaling messages, each scoped to a `target` peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum SignalingMessage {
    /// Offer for the target peer
    #[serde(rename = "webrtc_offer")]
    Offer {
        /// Recipient peer ID
        target: String,
        /// Local offer description
        offer: SessionDescription,
    },

    /// Answer for the target peer
    #[serde(rename = "webrtc_answer")]
    Answer {
        /// Recipient peer ID
        target: String,
        /// Local answer description
        answer: SessionDescription,
    },

    /// Locally discovered candidate for the target peer
    #[serde(rename = "webrtc_ice_candidate")]
    IceCandidate {
        /// Recipient peer ID
        target: String,
        /// Candidate payload
        candidate: IceCandidateInit,
    },
}

impl SignalingMessage {
    /// Get the wire event name
    pub fn event(&self) -> &'static str {
        match self {
            SignalingMessage::Offer { .. } => "webrtc_offer",
            SignalingMessage::Answer { .. } => "webrtc_answer",
            SignalingMessage::IceCandidate { .. } => "webrtc_ice_candidate",
        }
    }

    /// Get the recipient peer ID
    pub fn target(&self) -> &str {
        match self {
            SignalingMessage::Offer { target, .. } => target,
            SignalingMessage::Answer { target, .. } => target,
            SignalingMessage::IceCandidate { target, .. } => target,
        }
    }

    /// Convert message to JSON string
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::Protocol(format!("failed to serialize signaling message: {}", e)))
    }

    /// Parse message from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Protocol(format!("failed to deserialize signaling message: {}", e)))
    }
}

/// Inbound signaling messages, dispatched by the relay with the sender's ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundSignal {
    /// Offer from a remote peer
    Offer {
        /// Originating peer ID
        sender_id: String,
        /// Remote offer description
        offer: SessionDescription,
    },

    /// Answer from a remote peer
    Answer {
        /// Originating peer ID
        sender_id: String,
        /// Remote answer description
        answer: SessionDescription,
    },

    /// Candidate from a remote peer
    IceCandidate {
        /// Originating peer ID
        sender_id: String,
        /// Candidate payload
        candidate: IceCandidateInit,
    },
}

impl InboundSignal {
    /// Parse an inbound message from its wire event name and payload,
    /// rejecting unknown events and malformed payloads at the boundary.
    pub fn parse(event: &str, payload: serde_json::Value) -> Result<Self> {
        match event {
            "webrtc_offer" => {
                #[derive(Deserialize)]
                struct Payload {
                    sender_id: String,
                    offer: SessionDescription,
                }
                let p: Payload = decode(event, payload)?;
                Ok(InboundSignal::Offer {
                    sender_id: p.sender_id,
                    offer: p.offer,
                })
            }
            "webrtc_answer" => {
                #[derive(Deserialize)]
                struct Payload {
                    sender_id: String,
                    answer: SessionDescription,
                }
                let p: Payload = decode(event, payload)?;
                Ok(InboundSignal::Answer {
                    sender_id: p.sender_id,
                    answer: p.answer,
                })
            }
            "webrtc_ice_candidate" => {
                #[derive(Deserialize)]
                struct Payload {
                    sender_id: String,
                    candidate: IceCandidateInit,
                }
                let p: Payload = decode(event, payload)?;
                Ok(InboundSignal::IceCandidate {
                    sender_id: p.sender_id,
                    candidate: p.candidate,
                })
            }
            other => Err(Error::Protocol(format!(
                "unknown signaling event: {}",
                other
            ))),
        }
    }

    /// Get the originating peer ID
    pub fn sender_id(&self) -> &str {
        match self {
            InboundSignal::Offer { sender_id, .. } => sender_id,
            InboundSignal::Answer { sender_id, .. } => sender_id,
            InboundSignal::IceCandidate { sender_id, .. } => sender_id,
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(event: &str, payload: serde_json::Value) -> Result<T> {
    serde_json::from_value(payload)
        .map_err(|e| Error::Protocol(format!("malformed {} payload: {}", event, e)))
}
