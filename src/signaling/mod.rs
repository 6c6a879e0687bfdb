//! Signaling transport boundary
//!
//! The relay channel itself lives outside this crate; it only has to deliver
//! named messages to a named recipient reliably and in order. The coordinator
//! talks to it through [`SignalingChannel`].

pub mod protocol;

use crate::Result;
use async_trait::async_trait;
use protocol::SignalingMessage;

/// Reliable, ordered, named-message relay to other conference participants.
///
/// `push` resolves once the message has been handed to the relay; a failed
/// push is surfaced to the caller as a delivery error and never retried here.
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    /// Deliver one signaling message to its target peer.
    async fn push(&self, message: SignalingMessage) -> Result<()>;
}
